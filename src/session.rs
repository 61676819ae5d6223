//! # Session context
//!
//! All state private to one user session lives in [`ChatSession`]: the
//! conversation id, the bounded history, the model/temperature settings and
//! the input staging machine. It is created when a session starts, reset by
//! "new conversation" and dropped when the session ends; every operation
//! receives it explicitly.

use tracing::info;
use uuid::Uuid;

use crate::{
    config::{FrostConfig, validate_temperature},
    error::{ChatError, Result},
    history::History,
    staging::InputStaging,
};

/// Model and temperature for the next completion call.
///
/// Changes never touch past turns.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    model: String,
    temperature: f64,
    allowed_models: Vec<String>,
}

impl SessionSettings {
    /// Build settings, checking the model and temperature.
    pub fn new(model: &str, temperature: f64, allowed_models: Vec<String>) -> Result<Self> {
        let mut settings = Self {
            model: String::new(),
            temperature: 0.0,
            allowed_models,
        };
        settings.set_model(model)?;
        settings.set_temperature(temperature)?;
        Ok(settings)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn allowed_models(&self) -> &[String] {
        &self.allowed_models
    }

    /// Select another allow-listed model; anything else leaves the current one.
    pub fn set_model(&mut self, model: &str) -> Result<()> {
        if !self.allowed_models.iter().any(|m| m == model) {
            return Err(ChatError::InvalidModel(model.to_string()));
        }
        self.model = model.to_string();
        Ok(())
    }

    /// Set a temperature in `[0.0, 1.5]`, snapped to the 0.1 step.
    pub fn set_temperature(&mut self, temperature: f64) -> Result<()> {
        self.temperature = validate_temperature(temperature)?;
        Ok(())
    }
}

/// Session-scoped conversation context.
#[derive(Debug, Clone)]
pub struct ChatSession {
    conversation_id: String,
    pub history: History,
    pub settings: SessionSettings,
    pub staging: InputStaging,
}

impl ChatSession {
    pub fn new(settings: SessionSettings, max_history: usize) -> Self {
        let session = Self {
            conversation_id: new_conversation_id(),
            history: History::new(max_history),
            settings,
            staging: InputStaging::new(),
        };
        info!("Started conversation {}", session.conversation_id);
        session
    }

    /// Session seeded from the configured model, temperature and history bound.
    pub fn from_config(config: &FrostConfig) -> Result<Self> {
        let settings = SessionSettings::new(
            &config.model,
            config.temperature,
            config.allowed_models.clone(),
        )?;
        Ok(Self::new(settings, config.max_history))
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    /// Start a new conversation: fresh id, empty history, cleared staging.
    ///
    /// Settings are kept.
    pub fn reset(&mut self) {
        self.conversation_id = new_conversation_id();
        self.history.clear();
        self.staging.reset();
        info!("Started new conversation {}", self.conversation_id);
    }
}

fn new_conversation_id() -> String {
    Uuid::new_v4().to_string()
}
