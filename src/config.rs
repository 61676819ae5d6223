//! This module provides functionality for loading and validating the application's configuration.
//!
//! It defines the `FrostConfig` struct, which holds the configuration parameters,
//! and a `load_config` function to load the configuration from a YAML file.
//!
//! # Examples
//!
//! ```no_run
//! use frost_chat::config::{FrostConfig, load_config};
//!
//! let config: FrostConfig = load_config("/path/to/config.yaml").unwrap();
//! println!("{:?}", config);
//! ```

use serde::{Deserialize, Serialize};
use std::{error::Error, fs};
use tracing::debug;

use crate::{error::ChatError, history::MAX_HISTORY};

/// Models the client may request unless the config says otherwise.
pub const DEFAULT_MODELS: [&str; 5] = [
    "mistral-large",
    "llama3.1-8b",
    "llama3.1-70b",
    "mixtral-8x7b",
    "reka-core",
];

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer clearly and concisely.";

pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Inclusive temperature bounds accepted by the client.
pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 1.5;

/// Represents the application's configuration.
///
/// Every field except `api_base` has a default, so a minimal file only needs
/// to point at the completion service.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
pub struct FrostConfig {
    /// Base URL of the OpenAI-compatible completion service.
    pub api_base: String,

    /// Bearer token; leave empty for unsecured local backends.
    #[serde(default)]
    pub api_key: String,

    /// Model selected when a session starts.
    #[serde(default = "default_model")]
    pub model: String,

    /// Models a session may switch to.
    #[serde(default = "default_allowed_models")]
    pub allowed_models: Vec<String>,

    /// Temperature used when a session starts.
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Prepended to every request, never stored in history.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Number of turns kept in memory and replayed to the model.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// SQLite database holding the message log.
    #[serde(default = "default_session_db_url")]
    pub session_db_url: String,
}

fn default_model() -> String {
    DEFAULT_MODELS[0].to_string()
}

fn default_allowed_models() -> Vec<String> {
    DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

fn default_max_history() -> usize {
    MAX_HISTORY
}

fn default_session_db_url() -> String {
    "frost.db".to_string()
}

impl Default for FrostConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:5001/v1".to_string(),
            api_key: String::new(),
            model: default_model(),
            allowed_models: default_allowed_models(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: default_system_prompt(),
            max_history: MAX_HISTORY,
            session_db_url: default_session_db_url(),
        }
    }
}

impl FrostConfig {
    /// Check the invariants the session relies on.
    ///
    /// # Errors
    /// - [`ChatError::InvalidModel`] if `model` is not in `allowed_models`.
    /// - [`ChatError::InvalidTemperature`] if `temperature` is outside `[0.0, 1.5]`.
    /// - [`ChatError::Config`] for an empty allow-list or `max_history == 0`.
    pub fn validate(&self) -> Result<(), ChatError> {
        if self.allowed_models.is_empty() {
            return Err(ChatError::Config("allowed_models must not be empty".into()));
        }
        if !self.allowed_models.contains(&self.model) {
            return Err(ChatError::InvalidModel(self.model.clone()));
        }
        validate_temperature(self.temperature)?;
        if self.max_history == 0 {
            return Err(ChatError::Config("max_history must be at least 1".into()));
        }
        Ok(())
    }
}

/// Accept a temperature in `[0.0, 1.5]`, snapped to one decimal place.
pub fn validate_temperature(temperature: f64) -> Result<f64, ChatError> {
    if !temperature.is_finite() || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(ChatError::InvalidTemperature(temperature));
    }
    Ok((temperature * 10.0).round() / 10.0)
}

/// Loads the application's configuration from a YAML file.
///
/// The file is parsed and then validated with [`FrostConfig::validate`].
///
/// # Errors
/// Returns an error if the file cannot be read, is not valid YAML for
/// `FrostConfig`, or fails validation.
pub fn load_config(file: &str) -> Result<FrostConfig, Box<dyn Error>> {
    debug!("Loading config from {}", file);
    let content = fs::read_to_string(file)?;
    let config: FrostConfig = serde_yaml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}
