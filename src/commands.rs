//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum that represents the available subcommands and their
//! options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use frost_chat::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Ask { question, .. } = cli.command {
//!     println!("asking: {question}");
//! }
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Path to the YAML configuration (defaults to `<config_dir>/config.yaml`).
    #[arg(long, global = true, env = "FROST_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Start an interactive conversation.
    #[clap(name = "chat", alias = "c")]
    Chat {
        /// Model to start with; must be in the allow-list.
        #[arg(short = 'm', long)]
        model: Option<String>,

        /// Sampling temperature in [0.0, 1.5].
        #[arg(short = 't', long)]
        temperature: Option<f64>,
    },

    /// Ask a single question and print the answer.
    #[clap(name = "ask", alias = "a")]
    Ask {
        /// The question to send.
        question: String,

        #[arg(short = 'm', long)]
        model: Option<String>,

        #[arg(short = 't', long)]
        temperature: Option<f64>,
    },

    /// Print the persisted turns of a conversation.
    Transcript {
        /// Conversation id as shown by the status line.
        conversation_id: String,
    },

    /// List the models a session may use.
    Models,

    /// Write a default configuration file.
    Init,
}
