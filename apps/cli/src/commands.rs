//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use genscribe_artifacts::version_dir_name;
use genscribe_completion::OpenAiClient;
use genscribe_core::{PipelineContext, ProgressReporter, run_dropdown, run_welcome};
use genscribe_shared::{
    SETTINGS_FILE_NAME, Settings, init_settings, load_settings, validate_settings,
};
use genscribe_storage::LogStore;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// genscribe: generate content with a chat model and keep every result.
#[derive(Parser)]
#[command(
    name = "genscribe",
    version,
    about = "Generate welcome messages and dropdown code with a chat model, keeping full history.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Settings file (defaults to ./settings.toml, then ~/.genscribe/settings.toml).
    #[arg(long, env = "GENSCRIBE_CONFIG", global = true)]
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

/// Which append-only log to inspect.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum LogKind {
    Welcome,
    Dropdown,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the welcome pipeline, then the dropdown pipeline.
    Run,

    /// Generate a welcome message and append it to the welcome log.
    Welcome,

    /// Generate dropdown code, log it, and write a new version directory.
    Dropdown,

    /// Inspect a response log.
    History {
        /// Log to read.
        #[arg(value_enum)]
        log: LogKind,

        /// Print the entry at this 1-based position instead of the count.
        #[arg(long)]
        show: Option<usize>,
    },

    /// Settings management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a settings file with defaults.
    Init {
        /// Where to write it (defaults to ./settings.toml).
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show resolved settings.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "genscribe=info",
        1 => "genscribe=debug",
        _ => "genscribe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Run => cmd_run(config_path, true, true).await,
        Command::Welcome => cmd_run(config_path, true, false).await,
        Command::Dropdown => cmd_run(config_path, false, true).await,
        Command::History { log, show } => cmd_history(config_path, log, show),
        Command::Config { action } => match action {
            ConfigAction::Init { path } => cmd_config_init(path),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, welcome: bool, dropdown: bool) -> Result<()> {
    let settings = load_settings(config_path)?;
    validate_settings(&settings)?;

    // One client for every pipeline in this process.
    let client = OpenAiClient::from_settings(&settings)?;
    let ctx = PipelineContext::new(&client, &settings);

    info!(
        model = %settings.general.model,
        endpoint = %client.endpoint(),
        "settings resolved"
    );

    if welcome {
        let reporter = CliProgress::new();
        let outcome = run_welcome(&ctx, &reporter).await?;
        drop(reporter);
        println!(
            "Welcome message saved to {} (entry {})",
            outcome.log_path.display(),
            outcome.log_len
        );
    }

    if dropdown {
        let reporter = CliProgress::new();
        let outcome = run_dropdown(&ctx, &reporter).await?;
        drop(reporter);
        let bundle = &outcome.bundle;
        if bundle.version == outcome.log_len {
            println!(
                "Dropdown code written to {} (entry {})",
                bundle.dir.display(),
                outcome.log_len
            );
        } else {
            println!(
                "Dropdown code written to {} (entry {}; {} was already taken)",
                bundle.dir.display(),
                outcome.log_len,
                version_dir_name(outcome.log_len)
            );
        }
    }

    Ok(())
}

fn cmd_history(config_path: Option<&Path>, kind: LogKind, show: Option<usize>) -> Result<()> {
    let settings = load_settings(config_path)?;
    let log = match kind {
        LogKind::Welcome => LogStore::new(settings.output.welcome_log()),
        LogKind::Dropdown => LogStore::new(settings.output.dropdown_log()),
    };

    match show {
        Some(position) => {
            let entry = log.entry(position)?.ok_or_else(|| {
                eyre!(
                    "no entry {position} in {} (it holds {})",
                    log.path().display(),
                    log.len().unwrap_or(0)
                )
            })?;
            println!("{entry}");
        }
        None => {
            println!("{}: {} entries", log.path().display(), log.len()?);
        }
    }

    Ok(())
}

fn cmd_config_init(path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| PathBuf::from(SETTINGS_FILE_NAME));
    let written = init_settings(&path)?;
    println!("Settings initialized at: {}", written.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let settings: Settings = load_settings(config_path)?;
    let toml_str = toml::to_string_pretty(&settings)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn finished(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Clears the spinner on error paths too.
        self.spinner.finish_and_clear();
    }
}
