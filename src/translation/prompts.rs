/*!
 * Prompt construction and response parsing for batch translation.
 */

use crate::providers::ChatMessage;

/// System message sent with every request
pub const SYSTEM_PROMPT: &str = "You are a professional subtitle translator.";

/// Separates the rules from the lines to translate
pub const INPUT_MARKER: &str = "Input:\n";

/// Build the user prompt for one batch of flattened subtitle texts
pub fn build_prompt(texts: &[String], source_language: Option<&str>, target_language: &str) -> String {
    let source_instruction = source_language
        .filter(|lang| !lang.trim().is_empty())
        .map(|lang| format!(" from {}", lang))
        .unwrap_or_default();

    format!(
        "Translate the following subtitle lines{} into {}.\n\
         STRICT RULES:\n\
         1. Output ONLY the translated text.\n\
         2. Do NOT output line numbers, timestamps, or original text.\n\
         3. Maintain the exact same number of lines as input.\n\
         4. Keep the tone suitable for subtitles (concise).\n\
         5. No explanations, no markdown, no quotes.\n\n\
         {}{}",
        source_instruction,
        target_language,
        INPUT_MARKER,
        texts.join("\n")
    )
}

/// Messages for one batch request: the fixed system prompt, then the batch prompt
pub fn build_messages(texts: &[String], source_language: Option<&str>, target_language: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(build_prompt(texts, source_language, target_language)),
    ]
}

/// Split a completion into translated lines, dropping blank ones
pub fn parse_response_lines(content: &str) -> Vec<String> {
    content
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
