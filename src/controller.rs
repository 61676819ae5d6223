//! # Conversation turn controller
//!
//! Runs one user turn end to end:
//!
//! ```text
//! Idle → UserTurnAppended → PersistedUser* → AwaitingCompletion
//!      → Completed | EmptyResponse | CompletionError
//!      → PersistedAssistant* (Completed only) → Idle
//!
//! * best-effort: a failed write becomes a warning
//! ```
//!
//! A failed or empty reply never rolls back the user's turn; it stays in the
//! history and the user can simply submit again.

use std::fmt;
use tracing::{debug, error, info, warn};

use crate::{
    completion::CompletionClient,
    error::ChatError,
    history::{Role, Turn},
    normalize::extract_text,
    persistence::TurnStore,
    session::ChatSession,
};

/// States a turn passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    UserTurnAppended,
    PersistedUser,
    AwaitingCompletion,
    Completed,
    EmptyResponse,
    CompletionError,
    PersistedAssistant,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::UserTurnAppended => "user turn appended",
            TurnPhase::PersistedUser => "user turn persisted",
            TurnPhase::AwaitingCompletion => "awaiting completion",
            TurnPhase::Completed => "completed",
            TurnPhase::EmptyResponse => "empty response",
            TurnPhase::CompletionError => "completion error",
            TurnPhase::PersistedAssistant => "assistant turn persisted",
        };
        f.write_str(name)
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The assistant answered; the text was appended to the history.
    Completed(String),
    /// The service returned nothing usable.
    EmptyResponse,
    /// The completion call failed.
    Failed(ChatError),
}

/// Result of one turn: the outcome, non-blocking warnings and the phases
/// the turn went through.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    pub warnings: Vec<ChatError>,
    pub phases: Vec<TurnPhase>,
}

impl TurnReport {
    fn new() -> Self {
        Self {
            outcome: TurnOutcome::EmptyResponse,
            warnings: Vec::new(),
            phases: vec![TurnPhase::Idle],
        }
    }

    fn enter(&mut self, phase: TurnPhase) {
        debug!("Turn phase: {}", phase);
        self.phases.push(phase);
    }

    /// The assistant text, if the turn completed.
    pub fn reply(&self) -> Option<&str> {
        match &self.outcome {
            TurnOutcome::Completed(text) => Some(text),
            _ => None,
        }
    }

    /// The blocking error for this turn, if any.
    ///
    /// An empty response is reported as [`ChatError::EmptyCompletion`].
    pub fn error(&self) -> Option<ChatError> {
        match &self.outcome {
            TurnOutcome::Completed(_) => None,
            TurnOutcome::EmptyResponse => Some(ChatError::EmptyCompletion),
            TurnOutcome::Failed(err) => Some(err.clone()),
        }
    }
}

/// Drives turns against a completion client and a message log.
pub struct TurnController {
    client: CompletionClient,
    store: Box<dyn TurnStore>,
    system_prompt: String,
}

impl TurnController {
    pub fn new(client: CompletionClient, store: Box<dyn TurnStore>, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            store,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Drain the session's pending submission, if any, and run it as a turn.
    pub async fn process_pending(&mut self, session: &mut ChatSession) -> Option<TurnReport> {
        let text = session.staging.drain()?;
        Some(self.handle_user_message(session, &text).await)
    }

    /// Run one turn for `user_input`.
    pub async fn handle_user_message(&mut self, session: &mut ChatSession, user_input: &str) -> TurnReport {
        let mut report = TurnReport::new();

        session.history.push(Turn::user(user_input));
        report.enter(TurnPhase::UserTurnAppended);

        if self.persist(session.conversation_id(), Role::User, user_input, &mut report) {
            report.enter(TurnPhase::PersistedUser);
        }

        let payload = session.history.payload(&self.system_prompt);
        report.enter(TurnPhase::AwaitingCompletion);

        let raw = self
            .client
            .complete(
                session.settings.model(),
                payload,
                session.settings.temperature(),
            )
            .await;

        match raw {
            Err(err) => {
                error!("Completion failed: {}", err);
                report.enter(TurnPhase::CompletionError);
                report.outcome = TurnOutcome::Failed(err);
            }
            Ok(response) => match extract_text(response.as_ref()) {
                None => {
                    warn!("Completion returned no usable text");
                    report.enter(TurnPhase::EmptyResponse);
                    report.outcome = TurnOutcome::EmptyResponse;
                }
                Some(text) => {
                    report.enter(TurnPhase::Completed);
                    session.history.push(Turn::assistant(text.clone()));
                    if self.persist(session.conversation_id(), Role::Assistant, &text, &mut report) {
                        report.enter(TurnPhase::PersistedAssistant);
                    }
                    info!(
                        "Turn completed for conversation {} ({} turns in history)",
                        session.conversation_id(),
                        session.history.len()
                    );
                    report.outcome = TurnOutcome::Completed(text);
                }
            },
        }

        report.enter(TurnPhase::Idle);
        report
    }

    fn persist(&mut self, conversation_id: &str, role: Role, content: &str, report: &mut TurnReport) -> bool {
        match self.store.save(conversation_id, role, content) {
            Ok(()) => true,
            Err(err) => {
                warn!("Could not save {} turn: {}", role, err);
                report.warnings.push(err);
                false
            }
        }
    }
}
