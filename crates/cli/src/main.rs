// mcfdesk - chat with an MCF reconciliation sheet

mod exit_codes;
mod repl;

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use mcfdesk_ai::Assistant;
use mcfdesk_cli::{ChatSession, SourceArgs, SourceError};
use mcfdesk_config::ai::{self, AIConfigStatus, AIDiagnostics, ResolvedAIConfig};
use mcfdesk_config::credentials;
use mcfdesk_config::secrets::SecretError;
use mcfdesk_config::settings::Settings;
use mcfdesk_recon::Style;

use exit_codes::{
    source_exit_code, EXIT_AI_DISABLED, EXIT_AI_MISSING_KEY, EXIT_AI_NOT_IMPLEMENTED, EXIT_CHAT_ERROR,
    EXIT_ERROR, EXIT_NO_DATA, EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "mcfdesk")]
#[command(about = "Ask questions about, and make small fixes to, an MCF reconciliation sheet")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: ~/.config/mcfdesk/settings.json)
    #[arg(long, global = true, env = "MCFDESK_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// More logging (-v debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat
    #[command(after_help = "\
Examples:
  mcfdesk chat --local ./export
  mcfdesk chat --spreadsheet-id 1AbC... --credentials ~/creds.json")]
    Chat {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        chat: ChatArgs,
    },

    /// Answer one message and exit
    #[command(after_help = "\
Examples:
  mcfdesk ask 'Give me a summary' --local ./export
  mcfdesk ask 'mark MCF-20250428-0588 as reviewed' --local ./export --json")]
    Ask {
        /// The message, as typed in chat
        message: String,

        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        chat: ChatArgs,

        /// Print the turn as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load every tab and report row counts
    Load {
        #[command(flatten)]
        source: SourceArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Store Google credentials in the system keychain
    Auth {
        /// Credential JSON file, or - for stdin
        file: PathBuf,
    },

    /// AI provider configuration
    #[command(subcommand)]
    Ai(AiCommands),
}

#[derive(Subcommand)]
enum AiCommands {
    /// Show the resolved AI configuration
    Doctor {
        #[arg(long)]
        json: bool,
    },

    /// Store an API key in the keychain (read from stdin)
    SetKey {
        /// Provider name (gemini, openai)
        provider: String,
    },

    /// Remove a stored API key
    DeleteKey {
        provider: String,
    },
}

#[derive(Debug, Clone, clap::Args)]
struct ChatArgs {
    /// Pause before each reply, milliseconds (default from settings)
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Answer with rules only, never call the AI provider
    #[arg(long)]
    no_ai: bool,
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose > 0 { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = load_settings(cli.config.as_ref()).and_then(|settings| match cli.command {
        Commands::Chat { source, chat } => cmd_chat(&settings, source, chat),
        Commands::Ask { message, source, chat, json } => cmd_ask(&settings, source, chat, &message, json),
        Commands::Load { source, json } => cmd_load(&settings, source, json),
        Commands::Auth { file } => cmd_auth(file),
        Commands::Ai(AiCommands::Doctor { json }) => cmd_ai_doctor(&settings, json),
        Commands::Ai(AiCommands::SetKey { provider }) => cmd_ai_set_key(&provider),
        Commands::Ai(AiCommands::DeleteKey { provider }) => {
            ai::delete_api_key(&provider).map_err(CliError::keychain)
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn keychain(err: SecretError) -> Self {
        let hint = match err {
            SecretError::Unsupported => Some("use the MCFDESK_* environment variables instead".to_string()),
            SecretError::Keychain(_) => None,
        };
        Self { code: EXIT_ERROR, message: err.to_string(), hint }
    }

    /// Exit code only; the command already printed its output.
    pub fn silent(code: u8) -> Self {
        Self { code, message: String::new(), hint: None }
    }

    pub fn source(err: SourceError) -> Self {
        let code = source_exit_code(&err);
        let hint = match &err {
            SourceError::NoSource => {
                Some("pass --local <DIR> or --spreadsheet-id <ID> (or set sheets.spreadsheet_id)".to_string())
            }
            SourceError::NoCredentials => Some(format!(
                "pass --credentials <FILE>, set {}, or run 'mcfdesk auth <FILE>'",
                credentials::GOOGLE_CREDENTIALS_ENV
            )),
            SourceError::Sheets(e) if e.is_auth() => {
                Some("check the credentials and that the sheet is shared with that account".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<Settings, CliError> {
    match path {
        Some(path) => Settings::load_from(path)
            .map_err(|e| CliError::args(e.to_string()).with_hint("fix or remove the --config file")),
        None => Ok(Settings::load()),
    }
}

// ============================================================================
// Session setup
// ============================================================================

fn style(settings: &Settings) -> Style {
    Style { currency: settings.chat.currency.clone(), ..Style::default() }
}

/// The AI fallback, when configured and usable. Problems are warnings: the
/// rule table still answers.
fn assistant(settings: &Settings, chat: &ChatArgs) -> Option<Assistant> {
    if chat.no_ai || !settings.ai.provider.is_enabled() {
        return None;
    }
    let config = ResolvedAIConfig::from_settings(&settings.ai);
    if !config.status.is_ready() {
        log::warn!(
            "AI fallback off: {}",
            config.blocking_reason().unwrap_or_else(|| config.status.as_str().to_string())
        );
        return None;
    }
    match Assistant::new(config) {
        Ok(a) => Some(a),
        Err(e) => {
            log::warn!("AI fallback off: {}", e);
            None
        }
    }
}

fn open_session(settings: &Settings, source: &SourceArgs, chat: &ChatArgs) -> Result<(ChatSession, String), CliError> {
    let layout = source.load_layout(settings).map_err(CliError::source)?;
    let opened = source.open(settings).map_err(CliError::source)?;
    let delay = Duration::from_millis(chat.delay_ms.unwrap_or(settings.chat.delay_ms));
    let session = ChatSession::connect(opened.workbook, layout, style(settings), assistant(settings, chat), delay);
    Ok((session, opened.description))
}

// ============================================================================
// chat
// ============================================================================

fn cmd_chat(settings: &Settings, source: SourceArgs, chat: ChatArgs) -> Result<(), CliError> {
    let (mut session, description) = open_session(settings, &source, &chat)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    repl::print_banner(&session, &description, &mut stdout).map_err(|e| CliError::io(e.to_string()))?;
    repl::run(&mut session, stdin.lock(), &mut stdout).map_err(|e| CliError::io(e.to_string()))?;
    session.disconnect();
    Ok(())
}

// ============================================================================
// ask
// ============================================================================

fn cmd_ask(settings: &Settings, source: SourceArgs, chat: ChatArgs, message: &str, json: bool) -> Result<(), CliError> {
    if message.trim().is_empty() {
        return Err(CliError::args("message is empty"));
    }
    let (mut session, _) = open_session(settings, &source, &chat)?;
    let no_data = session.report().master().is_none();
    let turn = session.handle(message);

    if json {
        let out = serde_json::to_string_pretty(&turn).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", out);
    } else {
        println!("{}", turn.text.trim_end());
    }

    if no_data {
        Err(CliError::silent(EXIT_NO_DATA))
    } else if turn.has_errors() {
        Err(CliError::silent(EXIT_CHAT_ERROR))
    } else {
        Ok(())
    }
}

// ============================================================================
// load
// ============================================================================

fn cmd_load(settings: &Settings, source: SourceArgs, json: bool) -> Result<(), CliError> {
    let layout = source.load_layout(settings).map_err(CliError::source)?;
    let opened = source.open(settings).map_err(CliError::source)?;
    let report = mcfdesk_recon::load_workbook(opened.workbook.as_ref(), &layout);

    if json {
        let tabs: Vec<serde_json::Value> = report
            .outcomes
            .iter()
            .map(|(tab, outcome)| {
                let mut v = serde_json::to_value(outcome).unwrap_or(serde_json::Value::Null);
                v["tab"] = serde_json::Value::String(tab.clone());
                v
            })
            .collect();
        let out = serde_json::json!({
            "source": opened.description,
            "master_tab": report.master_tab,
            "records": report.master().map(|t| t.len()),
            "tabs": tabs,
        });
        println!("{}", serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?);
    } else {
        println!("Loaded from {}", opened.description);
        print!("{}", report.render());
    }

    if report.master().is_none() {
        return Err(CliError {
            code: EXIT_NO_DATA,
            message: format!("master tab '{}' did not load", report.master_tab),
            hint: None,
        });
    }
    Ok(())
}

// ============================================================================
// auth
// ============================================================================

fn cmd_auth(file: PathBuf) -> Result<(), CliError> {
    let payload = if file.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).map_err(|e| CliError::io(e.to_string()))?;
        buf
    } else {
        std::fs::read_to_string(&file).map_err(|e| CliError::io(format!("cannot read {}: {}", file.display(), e)))?
    };

    // Validate before storing
    mcfdesk_sheets::GoogleCredentials::from_json(&payload)
        .map_err(|e| CliError::source(SourceError::Sheets(e)))?;
    credentials::store_google_credentials(payload.trim()).map_err(CliError::keychain)?;
    eprintln!("Stored Google credentials in the system keychain");
    Ok(())
}

// ============================================================================
// ai
// ============================================================================

fn cmd_ai_doctor(settings: &Settings, json: bool) -> Result<(), CliError> {
    let config = ResolvedAIConfig::from_settings(&settings.ai);
    let diag = AIDiagnostics::from_resolved(&config);

    if json {
        let out = serde_json::to_string_pretty(&diag).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", out);
    } else {
        print!("{}", diag);
        if config.status == AIConfigStatus::Disabled {
            println!();
            println!("AI is disabled. Set ai.provider in {}", Settings::config_path_display());
        }
    }

    match config.status {
        AIConfigStatus::Ready => Ok(()),
        AIConfigStatus::Disabled => Err(CliError::silent(EXIT_AI_DISABLED)),
        AIConfigStatus::MissingKey => Err(CliError::silent(EXIT_AI_MISSING_KEY)),
        AIConfigStatus::NotImplemented => Err(CliError::silent(EXIT_AI_NOT_IMPLEMENTED)),
    }
}

fn cmd_ai_set_key(provider: &str) -> Result<(), CliError> {
    let provider = provider.to_lowercase();
    if !matches!(provider.as_str(), "gemini" | "openai") {
        return Err(CliError::args(format!("unknown provider '{}'", provider))
            .with_hint("use gemini or openai"));
    }
    let mut key = String::new();
    io::stdin().read_line(&mut key).map_err(|e| CliError::io(e.to_string()))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::args("no key on stdin"));
    }
    ai::set_api_key(&provider, key).map_err(CliError::keychain)?;
    eprintln!("Stored {} key in the system keychain", provider);
    Ok(())
}
