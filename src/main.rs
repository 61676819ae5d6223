//! Main module for the Frost Chat CLI application (`frost`).
//!
//! Handles logging setup, configuration loading and dispatch to the
//! subcommands.
//!
//! # Examples
//!
//! ```sh
//! frost init
//! frost chat --model mistral-large --temperature 0.2
//! frost ask "What is a B-tree?"
//! frost transcript 6b1f5c2e-0d55-4a57-9a4e-1f0b5f0a9c11
//! ```

use clap::Parser;
use frost_chat::{
    chat, commands,
    config::{self, FrostConfig},
    config_dir,
    persistence::SqliteTurnStore,
    session::ChatSession,
};
use once_cell::sync::OnceCell;
use std::{
    error::Error,
    fs,
    io::{stdin, stdout},
    path::PathBuf,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> Result<(), Box<dyn Error>> {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    });
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run())
}

/// Parses the command line, loads the configuration and runs the subcommand.
async fn run() -> Result<(), Box<dyn Error>> {
    let cli = commands::Cli::parse();

    match cli.command {
        commands::Commands::Init => init(cli.config)?,
        commands::Commands::Chat { model, temperature } => {
            let frost_config = load(cli.config)?;
            let mut controller = chat::build_controller(&frost_config)?;
            let mut session = ChatSession::from_config(&frost_config)?;
            chat::apply_overrides(&mut session, model.as_deref(), temperature)?;
            chat::interactive_mode(&mut controller, &mut session, stdin().lock(), &mut stdout())
                .await?;
        }
        commands::Commands::Ask {
            question,
            model,
            temperature,
        } => {
            let frost_config = load(cli.config)?;
            let mut controller = chat::build_controller(&frost_config)?;
            let mut session = ChatSession::from_config(&frost_config)?;
            chat::apply_overrides(&mut session, model.as_deref(), temperature)?;
            chat::ask(&mut controller, &mut session, &question, &mut stdout()).await?;
        }
        commands::Commands::Transcript { conversation_id } => {
            let frost_config = load(cli.config)?;
            let mut store = SqliteTurnStore::open(&frost_config.session_db_url)?;
            for record in store.conversation_records(&conversation_id)? {
                println!("[{}] {}: {}", record.timestamp, record.role, record.content);
            }
        }
        commands::Commands::Models => {
            let frost_config = load(cli.config)?;
            for model in &frost_config.allowed_models {
                let marker = if *model == frost_config.model { "*" } else { " " };
                println!("{marker} {model}");
            }
        }
    }

    Ok(())
}

/// Loads the configuration from `--config` or `<config_dir>/config.yaml`.
fn load(config_path: Option<PathBuf>) -> Result<FrostConfig, Box<dyn Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };
    debug!("Loading config from: {}", config_path.display());
    config::load_config(&config_path.to_string_lossy())
}

/// Writes a default `config.yaml`, keeping the message log next to it.
///
/// An existing file is left untouched.
fn init(config_path: Option<PathBuf>) -> Result<(), Box<dyn Error>> {
    let config_dir = config_dir()?;
    let config_path = config_path.unwrap_or_else(|| config_dir.join("config.yaml"));

    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::create_dir_all(&config_dir)?;

    let config = FrostConfig {
        session_db_url: config_dir.join("frost.db").to_string_lossy().into_owned(),
        ..FrostConfig::default()
    };
    info!("Creating config file: {}", config_path.display());
    fs::write(&config_path, serde_yaml::to_string(&config)?)?;
    println!("Wrote {}", config_path.display());

    Ok(())
}
