//! # Conversation history
//!
//! Turns, roles and the bounded in-memory history that is replayed to the
//! completion service on every request.
//!
//! - [`trim`] keeps the most recent `n` turns in their original order.
//! - [`build_payload`] prepends a fresh system turn to the history without
//!   touching it.
//! - [`History`] owns the sequence; its only mutation is [`History::push`],
//!   which appends and trims in one step so the history never exceeds its
//!   bound at rest.
//!
//! The system prompt is never part of the stored history.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of turns kept in memory.
pub const MAX_HISTORY: usize = 20;

/// Sender role of a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Lowercase wire name (`"system"`, `"user"`, `"assistant"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a wire name; unknown names are `None`.
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message exchanged in the conversation.
///
/// Serializes to the `{"role": ..., "content": ...}` object completion
/// services expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Return the last `n` turns, keeping their relative order.
pub fn trim(turns: &[Turn], n: usize) -> &[Turn] {
    if turns.len() > n {
        &turns[turns.len() - n..]
    } else {
        turns
    }
}

/// Build the request payload: the system prompt followed by `turns`.
pub fn build_payload(system_prompt: &str, turns: &[Turn]) -> Vec<Turn> {
    let mut payload = Vec::with_capacity(turns.len() + 1);
    payload.push(Turn::system(system_prompt));
    payload.extend_from_slice(turns);
    payload
}

/// Size-bounded, ordered turn sequence for the active conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    turns: Vec<Turn>,
    max_turns: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl History {
    /// Create an empty history bounded to `max_turns` (at least one).
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// Append a turn, then drop the oldest turns beyond the bound.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        let excess = self.turns.len().saturating_sub(self.max_turns);
        if excess > 0 {
            tracing::debug!("Dropping {} oldest turn(s) from history", excess);
            self.turns.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    /// Payload for the next completion call.
    pub fn payload(&self, system_prompt: &str) -> Vec<Turn> {
        build_payload(system_prompt, &self.turns)
    }
}
