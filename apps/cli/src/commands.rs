//! CLI command definitions, routing, and tracing setup.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing::info;

use sheetprompt_compiler::{JsonWorkbook, KnowledgeCompiler};
use sheetprompt_core::{OpenAiCompatClient, PromptFiles, build_prompts_from_files, export_blocks};
use sheetprompt_session::{ChatOverrides, Conversation, ConversationOptions, SessionStore};
use sheetprompt_shared::{
    AppConfig, BlockKind, Role, SessionId, init_config, load_config, load_config_from,
    resolve_api_key,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SheetPrompt: workbook knowledge in, model conversations out.
#[derive(Parser)]
#[command(
    name = "sheetprompt",
    version,
    about = "Compile workbook sheets into prompt blocks and run persisted model conversations.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.sheetprompt/sheetprompt.toml).
    #[arg(long, global = true, env = "SHEETPROMPT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Compile the knowledge blocks from a workbook.
    Compile {
        /// JSON workbook path.
        #[arg(short, long)]
        workbook: PathBuf,

        /// Write blocks and blocks.json here instead of printing.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Print only this block.
        #[arg(short, long)]
        block: Option<BlockArg>,
    },

    /// Render the system and user prompts without calling the model.
    Prompts {
        #[command(flatten)]
        inputs: PromptArgs,
    },

    /// Multi-turn conversations.
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Block selector for `compile --block`.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum BlockArg {
    CoreGuide,
    TypeDefinitions,
    VariableMapping,
}

impl From<BlockArg> for BlockKind {
    fn from(arg: BlockArg) -> Self {
        match arg {
            BlockArg::CoreGuide => BlockKind::CoreGuide,
            BlockArg::TypeDefinitions => BlockKind::TypeDefinitions,
            BlockArg::VariableMapping => BlockKind::VariableMapping,
        }
    }
}

/// Inputs shared by `prompts` and `chat start`.
#[derive(Args)]
pub(crate) struct PromptArgs {
    /// JSON workbook path.
    #[arg(short, long)]
    workbook: PathBuf,

    /// System prompt template.
    #[arg(long)]
    system_template: PathBuf,

    /// User prompt template (contains {USER_QUERY}).
    #[arg(long)]
    user_template: PathBuf,

    /// Query text substituted for {USER_QUERY}.
    #[arg(short, long, conflicts_with = "query_file")]
    query: Option<String>,

    /// Read the query from a file.
    #[arg(long)]
    query_file: Option<PathBuf>,

    /// Extra placeholder for the user template, as TOKEN=VALUE (repeatable).
    #[arg(long = "set", value_parser = parse_key_val)]
    placeholders: Vec<(String, String)>,
}

/// Per-call model overrides.
#[derive(Args)]
pub(crate) struct OverrideArgs {
    /// Sampling temperature for this call.
    #[arg(long)]
    temperature: Option<f64>,

    /// Completion token limit for this call.
    #[arg(long)]
    max_tokens: Option<u32>,
}

impl OverrideArgs {
    fn to_overrides(&self) -> ChatOverrides {
        let mut overrides = ChatOverrides::new();
        if let Some(t) = self.temperature {
            overrides.insert("temperature".into(), json!(t));
        }
        if let Some(n) = self.max_tokens {
            overrides.insert("max_tokens".into(), json!(n));
        }
        overrides
    }
}

/// Chat subcommands.
#[derive(Subcommand)]
pub(crate) enum ChatAction {
    /// Build prompts from the workbook and start a new conversation.
    Start {
        /// Session id (generated when omitted).
        #[arg(short, long)]
        session: Option<String>,

        #[command(flatten)]
        inputs: PromptArgs,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Send a follow-up message.
    Continue {
        #[arg(short, long)]
        session: String,

        /// Follow-up message text.
        message: String,

        #[command(flatten)]
        overrides: OverrideArgs,
    },
    /// Append a message without calling the model.
    Add {
        #[arg(short, long)]
        session: String,

        /// Message role: user or assistant.
        #[arg(long, default_value = "user")]
        role: String,

        /// Message text.
        content: String,
    },
    /// Print the stored history.
    History {
        #[arg(short, long)]
        session: String,

        /// Print the raw JSON messages.
        #[arg(long)]
        json: bool,
    },
    /// Clear the stored history.
    Reset {
        #[arg(short, long)]
        session: String,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected TOKEN=VALUE, got '{s}'"))
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sheetprompt=warn",
        1 => "sheetprompt=info",
        2 => "sheetprompt=debug",
        _ => "sheetprompt=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    let config = || -> Result<AppConfig> {
        Ok(match &config_path {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        })
    };

    match cli.command {
        Command::Compile {
            workbook,
            out,
            block,
        } => cmd_compile(&config()?, &workbook, out.as_deref(), block),
        Command::Prompts { inputs } => cmd_prompts(&config()?, &inputs),
        Command::Chat { action } => {
            let config = config()?;
            match action {
                ChatAction::Start {
                    session,
                    inputs,
                    overrides,
                } => cmd_chat_start(&config, session.as_deref(), &inputs, &overrides),
                ChatAction::Continue {
                    session,
                    message,
                    overrides,
                } => cmd_chat_continue(&config, &session, &message, &overrides),
                ChatAction::Add {
                    session,
                    role,
                    content,
                } => cmd_chat_add(&config, &session, &role, &content),
                ChatAction::History { session, json } => cmd_chat_history(&config, &session, json),
                ChatAction::Reset { session } => cmd_chat_reset(&config, &session),
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config()?),
        },
    }
}

// ---------------------------------------------------------------------------
// Compile / prompts
// ---------------------------------------------------------------------------

fn cmd_compile(
    config: &AppConfig,
    workbook: &Path,
    out: Option<&Path>,
    block: Option<BlockArg>,
) -> Result<()> {
    let compiler = KnowledgeCompiler::new(JsonWorkbook::open(workbook)?);
    let blocks = compiler.compile_all(&config.sheets)?;

    if let Some(out) = out {
        let index = export_blocks(out, &blocks)?;
        println!();
        println!("  Blocks written to {}", out.display());
        for meta in &index.artifacts {
            println!("  {:<22} {:>8} bytes  {}", meta.filename, meta.size_bytes, &meta.sha256[..12]);
        }
        println!();
        return Ok(());
    }

    match block {
        Some(kind) => println!("{}", blocks.get(kind.into())),
        None => {
            for kind in BlockKind::ALL {
                println!("========== {} ==========\n", kind.as_str().to_uppercase());
                println!("{}\n", blocks.get(kind));
            }
        }
    }
    Ok(())
}

fn prompt_files(inputs: &PromptArgs) -> PromptFiles {
    PromptFiles {
        workbook: inputs.workbook.clone(),
        system_template: inputs.system_template.clone(),
        user_template: inputs.user_template.clone(),
    }
}

fn read_query(inputs: &PromptArgs) -> Result<String> {
    match (&inputs.query, &inputs.query_file) {
        (Some(q), _) => Ok(q.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| eyre!("cannot read query file '{}': {e}", path.display())),
        (None, None) => Err(eyre!("provide --query or --query-file")),
    }
}

fn render_from_inputs(config: &AppConfig, inputs: &PromptArgs) -> Result<sheetprompt_core::PromptPair> {
    let query = read_query(inputs)?;
    let extra: BTreeMap<String, String> = inputs.placeholders.iter().cloned().collect();
    Ok(build_prompts_from_files(
        &prompt_files(inputs),
        &config.sheets,
        &query,
        &extra,
    )?)
}

fn cmd_prompts(config: &AppConfig, inputs: &PromptArgs) -> Result<()> {
    let pair = render_from_inputs(config, inputs)?;
    println!("========== SYSTEM ==========\n");
    println!("{}\n", pair.system);
    println!("========== USER ==========\n");
    println!("{}", pair.user);
    Ok(())
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

fn parse_session(raw: &str) -> Result<SessionId> {
    Ok(raw.parse::<SessionId>()?)
}

fn store(config: &AppConfig) -> Result<SessionStore> {
    Ok(SessionStore::open(&config.defaults.sessions_dir)?)
}

fn options(config: &AppConfig) -> ConversationOptions {
    ConversationOptions {
        max_turns: config.defaults.max_turns,
        rolling_summary: config.defaults.rolling_summary,
    }
}

fn model_client(config: &AppConfig) -> Result<OpenAiCompatClient> {
    let api_key = resolve_api_key(config)?;
    Ok(OpenAiCompatClient::new(&config.model, api_key)?)
}

/// Spinner shown while a model call is in flight.
fn waiting(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

fn cmd_chat_start(
    config: &AppConfig,
    session: Option<&str>,
    inputs: &PromptArgs,
    overrides: &OverrideArgs,
) -> Result<()> {
    let id = match session {
        Some(raw) => parse_session(raw)?,
        None => SessionId::generate("cli"),
    };
    let pair = render_from_inputs(config, inputs)?;
    let client = model_client(config)?;
    let mut conversation = Conversation::open(id.clone(), store(config)?, client, options(config))?;

    info!(session = %id, "starting conversation");
    let spinner = waiting("Waiting for the model...");
    let reply = conversation.start(&pair.system, &pair.user, &overrides.to_overrides());
    spinner.finish_and_clear();

    println!("{}", reply?);
    eprintln!("\n  session: {id}");
    Ok(())
}

fn cmd_chat_continue(
    config: &AppConfig,
    session: &str,
    message: &str,
    overrides: &OverrideArgs,
) -> Result<()> {
    let id = parse_session(session)?;
    let client = model_client(config)?;
    let mut conversation = Conversation::open(id, store(config)?, client, options(config))?;
    if conversation.is_empty() {
        return Err(eyre!("session '{session}' has no history; use `chat start` first"));
    }

    let spinner = waiting("Waiting for the model...");
    let reply = conversation.continue_with(message, &overrides.to_overrides());
    spinner.finish_and_clear();

    println!("{}", reply?);
    Ok(())
}

/// Opens a conversation for commands that never reach the model.
struct OfflineClient;

impl sheetprompt_session::LanguageModelClient for OfflineClient {
    fn chat(
        &self,
        _messages: &[sheetprompt_shared::Message],
        _overrides: &ChatOverrides,
    ) -> sheetprompt_shared::Result<serde_json::Value> {
        Err(sheetprompt_shared::SheetPromptError::Model(
            "no model client configured for this command".into(),
        ))
    }
}

fn offline_conversation(config: &AppConfig, session: &str) -> Result<Conversation<OfflineClient>> {
    let id = parse_session(session)?;
    Ok(Conversation::open(id, store(config)?, OfflineClient, options(config))?)
}

fn cmd_chat_add(config: &AppConfig, session: &str, role: &str, content: &str) -> Result<()> {
    let mut conversation = offline_conversation(config, session)?;
    match role.parse::<Role>()? {
        Role::User => conversation.add_user(content)?,
        Role::Assistant => conversation.add_assistant(content)?,
        Role::System => return Err(eyre!("system messages are only set by `chat start`")),
    }
    println!("  {} message appended ({} total)", role, conversation.history().len());
    Ok(())
}

fn cmd_chat_history(config: &AppConfig, session: &str, as_json: bool) -> Result<()> {
    let conversation = offline_conversation(config, session)?;
    let history = conversation.history();

    if as_json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }
    if history.is_empty() {
        println!("  (no messages)");
        return Ok(());
    }
    for (i, message) in history.iter().enumerate() {
        println!("--- [{i}] {} ---", message.role);
        println!("{}\n", message.content);
    }
    Ok(())
}

fn cmd_chat_reset(config: &AppConfig, session: &str) -> Result<()> {
    let mut conversation = offline_conversation(config, session)?;
    conversation.reset()?;
    println!("  session '{session}' cleared");
    Ok(())
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("  Config written to {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let text = toml::to_string_pretty(config)?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_chat_start() {
        let cli = Cli::try_parse_from([
            "sheetprompt",
            "chat",
            "start",
            "--workbook",
            "rules.json",
            "--system-template",
            "s.txt",
            "--user-template",
            "u.txt",
            "--query",
            "split the feed",
            "--set",
            "{UNIT}=FCCU",
            "--temperature",
            "0.2",
        ])
        .expect("parse");

        match cli.command {
            Command::Chat {
                action:
                    ChatAction::Start {
                        session,
                        inputs,
                        overrides,
                    },
            } => {
                assert!(session.is_none());
                assert_eq!(inputs.query.as_deref(), Some("split the feed"));
                assert_eq!(inputs.placeholders, vec![("{UNIT}".into(), "FCCU".into())]);
                assert_eq!(overrides.to_overrides()["temperature"], json!(0.2));
            }
            _ => panic!("expected chat start"),
        }
    }

    #[test]
    fn key_val_parser() {
        assert_eq!(parse_key_val("A=b=c"), Ok(("A".into(), "b=c".into())));
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn query_flags_conflict() {
        let result = Cli::try_parse_from([
            "sheetprompt",
            "prompts",
            "-w",
            "rules.json",
            "--system-template",
            "s.txt",
            "--user-template",
            "u.txt",
            "--query",
            "q",
            "--query-file",
            "q.txt",
        ]);
        assert!(result.is_err());
    }
}
