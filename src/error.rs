//! Error taxonomy for a single chat turn.
//!
//! Every variant is local to one turn: none of them end the session, the user
//! can always submit again. [`ChatError::PersistenceFailure`] is the only
//! non-blocking kind; the controller reports it as a warning and carries on.

use thiserror::Error;

/// Errors that can occur while handling a turn or changing session settings.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChatError {
    /// The requested model is not in the configured allow-list.
    #[error("model not allowed: {0}")]
    InvalidModel(String),

    /// A temperature outside `[0.0, 1.5]` was requested.
    #[error("temperature out of range [0.0, 1.5]: {0}")]
    InvalidTemperature(f64),

    /// Writing a turn to the message log failed.
    #[error("could not save message: {0}")]
    PersistenceFailure(String),

    /// The completion service answered without usable text.
    #[error("empty response from the completion service (model unavailable, permissions or quota)")]
    EmptyCompletion,

    /// Any other failure of the completion call (network, status, decoding).
    #[error("completion failed: {0}")]
    CompletionFailure(String),

    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// `true` for errors that are reported as warnings and do not stop a turn.
    pub fn is_warning(&self) -> bool {
        matches!(self, ChatError::PersistenceFailure(_))
    }
}

impl From<diesel::result::Error> for ChatError {
    fn from(err: diesel::result::Error) -> Self {
        ChatError::PersistenceFailure(err.to_string())
    }
}

impl From<diesel::ConnectionError> for ChatError {
    fn from(err: diesel::ConnectionError) -> Self {
        ChatError::PersistenceFailure(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::CompletionFailure(err.to_string())
    }
}

/// Result type for turn-level operations.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_persistence_failure_is_a_warning() {
        assert!(ChatError::PersistenceFailure("disk full".into()).is_warning());
        assert!(!ChatError::EmptyCompletion.is_warning());
        assert!(!ChatError::InvalidModel("gpt-x".into()).is_warning());
        assert!(!ChatError::CompletionFailure("timeout".into()).is_warning());
    }

    #[test]
    fn test_messages_carry_the_underlying_cause() {
        let err = ChatError::CompletionFailure("403 Forbidden".into());
        assert_eq!(err.to_string(), "completion failed: 403 Forbidden");

        let err = ChatError::InvalidModel("gpt-x".into());
        assert!(err.to_string().contains("gpt-x"));
    }
}
