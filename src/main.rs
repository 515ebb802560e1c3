// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, error};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use srtrelay::app_config::{self, Config, OutputMode, RetryConfig, ServiceConfig, TimeoutConfig};
use srtrelay::providers::openai::OpenAiCompatible;
use srtrelay::session::{FixedPrompt, Interrupt, ResumePrompt, RunOutcome, TerminalPrompt};
use srtrelay::Controller;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// How to answer "Continue last progress?"
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ResumeAnswer {
    /// Ask on the terminal
    Ask,
    /// Always continue
    Yes,
    /// Always start over
    No,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for srtrelay
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// srtrelay - resumable SRT subtitle translation with LLMs
///
/// Sends the subtitles in batches to an OpenAI compatible chat completion
/// service and saves progress after each batch.
#[derive(Parser, Debug)]
#[command(name = "srtrelay")]
#[command(version)]
#[command(about = "Resumable batch subtitle translation with LLMs")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "srtrelay translates SRT subtitle files through any OpenAI compatible chat completion API.

Progress is saved next to the input in <input>.progress.json after every batch.
Run the same command again after a crash or Ctrl+C to continue.

EXAMPLES:
    srtrelay movie.srt -t German                     # Bilingual German subtitles next to the input
    srtrelay movie.srt -t Japanese --no-bilingual    # Translation only
    srtrelay movie.srt -t French -o out/ -b 20       # 20 cues per request, written to out/
    srtrelay movie.srt -t German --resume yes        # Continue without asking
    srtrelay completions bash > srtrelay.bash        # Generate bash completions

ENVIRONMENT:
    LLM_API_KEY, LLM_BASE_URL and LLM_MODEL select the service; a .env file in the
    working directory is read first. Defaults target a local Ollama server.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input SRT file
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Target language (e.g. 'German', 'Japanese')
    #[arg(short, long = "target-lang", alias = "target_lang")]
    target_lang: Option<String>,

    /// Source language; detected by the model when omitted
    #[arg(short, long = "source-lang", alias = "source_lang")]
    source_lang: Option<String>,

    /// Output file, or directory for <stem>.<lang>.srt
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Subtitles per request
    #[arg(short, long, default_value_t = app_config::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Write the translation only, without the original line
    #[arg(long)]
    no_bilingual: bool,

    /// Answer for resuming an unfinished run
    #[arg(long, value_enum, default_value = "ask")]
    resume: ResumeAnswer,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// API key of the completion service
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI compatible API
    #[arg(long, env = "LLM_BASE_URL")]
    base_url: Option<String>,

    /// Model name
    #[arg(long, env = "LLM_MODEL")]
    model: Option<String>,

    /// Retries after a transient failure
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay before the first retry, doubled on each further retry
    #[arg(long)]
    retry_delay_secs: Option<u64>,

    /// Timeout of requests until the first success
    #[arg(long)]
    first_timeout_secs: Option<u64>,

    /// Timeout of later requests
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl CommandLineOptions {
    /// Build the run configuration; CLI values win over defaults
    fn to_config(&self) -> Result<Config> {
        let target_language = self
            .target_lang
            .clone()
            .ok_or_else(|| anyhow!("--target-lang is required"))?;

        let service_defaults = ServiceConfig::default();
        let retry_defaults = RetryConfig::default();
        let timeout_defaults = TimeoutConfig::default();

        let config = Config {
            source_language: self.source_lang.clone().filter(|s| !s.trim().is_empty()),
            target_language,
            batch_size: self.batch_size,
            output_mode: if self.no_bilingual { OutputMode::Mono } else { OutputMode::Bilingual },
            output: self.output.clone(),
            service: ServiceConfig {
                api_key: self.api_key.clone().unwrap_or(service_defaults.api_key),
                base_url: self.base_url.clone().unwrap_or(service_defaults.base_url),
                model: self.model.clone().unwrap_or(service_defaults.model),
                temperature: service_defaults.temperature,
            },
            retry: RetryConfig {
                max_retries: self.max_retries.unwrap_or(retry_defaults.max_retries),
                base_delay_ms: self
                    .retry_delay_secs
                    .map(|secs| secs * 1000)
                    .unwrap_or(retry_defaults.base_delay_ms),
            },
            timeouts: TimeoutConfig {
                first_secs: self.first_timeout_secs.unwrap_or(timeout_defaults.first_secs),
                normal_secs: self.timeout_secs.unwrap_or(timeout_defaults.normal_secs),
            },
            log_level: self.log_level.clone().map(Into::into).unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color code and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level && metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let (color, tag) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Variables already set in the environment win over .env
    let dotenv = dotenvy::dotenv();

    if let Err(e) = CustomLogger::init(LevelFilter::Info) {
        eprintln!("Failed to initialize logger: {}", e);
    }

    if let Ok(path) = &dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "srtrelay", &mut std::io::stdout());
        return ExitCode::SUCCESS;
    }

    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match run_translate(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_translate(options: CommandLineOptions) -> Result<RunOutcome> {
    let input = options
        .input
        .clone()
        .ok_or_else(|| anyhow!("INPUT is required when no subcommand is specified"))?;

    let config = options.to_config().map_err(|e| anyhow!("Configuration error: {:#}", e))?;
    debug!("Using {} at {}", config.service.model, config.service.base_url);

    let provider = OpenAiCompatible::new(&config.service.base_url, &config.service.api_key);
    let mut controller = Controller::new(config, Box::new(provider));

    let prompt: Box<dyn ResumePrompt> = match options.resume {
        ResumeAnswer::Ask => Box::new(TerminalPrompt),
        ResumeAnswer::Yes => Box::new(FixedPrompt(true)),
        ResumeAnswer::No => Box::new(FixedPrompt(false)),
    };
    let prepared = controller.prepare(&input, prompt.as_ref())?;

    // Installed after the prompt so Ctrl+C while it waits still kills the process
    let interrupt = Interrupt::new();
    let _listener = interrupt.listen_for_ctrl_c();

    let outcome = controller.execute(prepared, &interrupt).await?;
    Ok(outcome)
}
