/*!
 * Tests for SRT parsing and rendering
 */

use anyhow::Result;
use srtrelay::subtitle_processor::{SubtitleCollection, SubtitleEntry};
use crate::common;

#[test]
fn test_parse_srt_string_withMultilineCue_shouldJoinWithNewline() -> Result<()> {
    let content = "1\n00:00:01,000 --> 00:00:04,000\nHello\nthere\n\n2\n00:00:05,000 --> 00:00:06,500\nBye\n";
    let entries = SubtitleCollection::parse_srt_string(content)?;

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text, "Hello\nthere");
    assert_eq!(entries[0].flattened_text(), "Hello there");
    assert_eq!(entries[1].start_time_ms, 5000);
    assert_eq!(entries[1].end_time_ms, 6500);
    Ok(())
}

#[test]
fn test_parse_srt_string_withCrlfAndMissingTrailingBlank_shouldParse() -> Result<()> {
    let content = "1\r\n00:00:01,000 --> 00:00:02,000\r\nA\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nB";
    let entries = SubtitleCollection::parse_srt_string(content)?;

    let texts: Vec<&str> = entries.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["A", "B"]);
    Ok(())
}

#[test]
fn test_parse_srt_string_withGarbage_shouldFail() {
    assert!(SubtitleCollection::parse_srt_string("just some words\nand more").is_err());
    assert!(SubtitleCollection::parse_srt_string("1\nnot a timestamp\n").is_err());
}

#[test]
fn test_parse_srt_string_withBlankContent_shouldReturnNoEntries() -> Result<()> {
    assert!(SubtitleCollection::parse_srt_string("\n\n  \n")?.is_empty());
    Ok(())
}

#[test]
fn test_format_timestamp_withLargeValue_shouldPadFields() {
    assert_eq!(SubtitleEntry::format_timestamp(3_723_004), "01:02:03,004");
    assert_eq!(SubtitleEntry::parse_timestamp("01:02:03,004").ok(), Some(3_723_004));
}

#[test]
fn test_write_to_srt_withEmptyCue_shouldReparseSameTimings() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "in.srt", 4)?;
    let mut subtitles = SubtitleCollection::load(&input)?;
    subtitles.entries[1].text.clear();
    subtitles.entries[2].text = "Zeile\nLine 2".to_string();

    let output = temp_dir.path().join("out.srt");
    subtitles.write_to_srt(&output)?;
    let reloaded = SubtitleCollection::load(&output)?;

    assert_eq!(reloaded.len(), 4);
    for (before, after) in subtitles.entries.iter().zip(&reloaded.entries) {
        assert_eq!(before.start_time_ms, after.start_time_ms);
        assert_eq!(before.end_time_ms, after.end_time_ms);
        assert_eq!(before.text, after.text);
    }
    Ok(())
}
