//! # Frost Chat (library root)
//!
//! Core plumbing for the `frost` terminal chat client:
//! - Response normalization and bounded history (`normalize`, `history`).
//! - Completion client and HTTP service (`completion`).
//! - Append-only message log on SQLite (`persistence`, `models`, `schema`).
//! - The per-turn state machine and the session context (`controller`, `session`).
//! - Input staging for front ends that re-render their input field (`staging`).
//! - CLI parsing, configuration and terminal output (`commands`, `config`, `render`, `chat`).
//!
//! ## Modules
//! - [`chat`], [`commands`], [`completion`], [`config`], [`controller`], [`error`],
//!   [`history`], [`models`], [`normalize`], [`persistence`], [`render`], [`schema`],
//!   [`session`], [`staging`]

use directories::ProjectDirs;
use std::error::Error;

pub mod chat;
pub mod commands;
pub mod completion;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod models;
pub mod normalize;
pub mod persistence;
pub mod render;
pub mod schema;
pub mod session;
pub mod staging;

/// Return the per-platform configuration directory used by Frost Chat.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "frost", "frost-chat")`, e.g. `~/.config/frost-chat` on Linux.
///
/// The directory is **not** created by this function; callers that need it should
/// create it with `fs::create_dir_all`.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined
/// (which is rare but possible in heavily sandboxed environments).
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "frost", "frost-chat")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}
