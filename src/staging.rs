//! # Input staging
//!
//! Keeps "the user submitted this text" apart from the input field that
//! produced it. A front end renders one live field per pass, identified by a
//! [`FieldKey`]. Submitting never clears that field in place: the text is
//! copied into a pending record, the key is retired and a new key (an empty
//! field) is minted for the next pass. Retired keys are never reused, so
//! stale bound text cannot be reconciled into the fresh field.
//!
//! ```text
//!   Empty ──submit(non-blank)──▶ Staged ──drain()──▶ Idle(new field)
//!     ▲  └─submit(blank)─┘                               │
//!     └──────────────────────── bind(text) ──────────────┘
//! ```
//!
//! ```rust
//! use frost_chat::staging::InputStaging;
//!
//! let mut staging = InputStaging::new();
//! let key = staging.field_key();
//! staging.bind(key, "  Bonjour ").unwrap();
//! assert!(staging.submit(key));
//! assert_ne!(staging.field_key(), key);
//! assert_eq!(staging.drain().as_deref(), Some("Bonjour"));
//! assert_eq!(staging.drain(), None);
//! ```

use std::fmt;
use tracing::debug;

/// Identity of one rendered input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(u64);

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "draft_{}", self.0)
    }
}

/// Where the staging machine is between render passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingState {
    /// Nothing submitted since the last drain.
    Empty,
    /// One submission waits to be drained.
    Staged,
    /// The last submission was drained and nothing has been bound since.
    Idle,
}

/// A submitted, not-yet-processed message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSubmission {
    pub text: String,
    pub flag: bool,
}

/// Error returned when text is bound to a field that is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetiredField(pub FieldKey);

impl fmt::Display for RetiredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input field {} has been retired", self.0)
    }
}

impl std::error::Error for RetiredField {}

#[derive(Debug, Clone)]
pub struct InputStaging {
    current: FieldKey,
    draft: String,
    pending: PendingSubmission,
    state: StagingState,
}

impl Default for InputStaging {
    fn default() -> Self {
        Self::new()
    }
}

impl InputStaging {
    pub fn new() -> Self {
        Self {
            current: FieldKey(0),
            draft: String::new(),
            pending: PendingSubmission::default(),
            state: StagingState::Empty,
        }
    }

    /// Key of the field to render on this pass.
    pub fn field_key(&self) -> FieldKey {
        self.current
    }

    pub fn state(&self) -> StagingState {
        self.state
    }

    pub fn pending(&self) -> &PendingSubmission {
        &self.pending
    }

    /// Text currently bound to the live field.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Bind typed text to the field `key`.
    ///
    /// Only the live field accepts text; a retired key is rejected. Binding
    /// after a drain starts the next cycle, so the state goes back to `Empty`.
    pub fn bind(&mut self, key: FieldKey, text: impl Into<String>) -> Result<(), RetiredField> {
        if key != self.current {
            return Err(RetiredField(key));
        }
        self.draft = text.into();
        if self.state == StagingState::Idle {
            self.state = StagingState::Empty;
        }
        Ok(())
    }

    /// Submit whatever is bound to `key`.
    ///
    /// Blank text (or a retired key) changes nothing and returns `false`.
    /// Otherwise the trimmed text becomes the pending submission, the field
    /// is retired and a new one is minted.
    pub fn submit(&mut self, key: FieldKey) -> bool {
        if key != self.current {
            debug!("Ignoring submit from retired field {}", key);
            return false;
        }

        let text = self.draft.trim();
        if text.is_empty() {
            return false;
        }

        self.pending = PendingSubmission {
            text: text.to_string(),
            flag: true,
        };
        self.rotate();
        self.state = StagingState::Staged;
        debug!("Staged submission, next field is {}", self.current);
        true
    }

    /// Take the pending submission, at most once per submit.
    pub fn drain(&mut self) -> Option<String> {
        if !self.pending.flag {
            return None;
        }
        let text = std::mem::take(&mut self.pending.text);
        self.pending.flag = false;
        self.state = StagingState::Idle;
        Some(text)
    }

    /// Drop any pending submission and present a fresh field.
    pub fn reset(&mut self) {
        self.pending = PendingSubmission::default();
        self.rotate();
        self.state = StagingState::Empty;
    }

    fn rotate(&mut self) {
        self.current = FieldKey(self.current.0 + 1);
        self.draft.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_submit_is_a_noop() {
        let mut staging = InputStaging::new();
        let key = staging.field_key();
        staging.bind(key, "   \t ").unwrap();

        assert!(!staging.submit(key));
        assert_eq!(staging.state(), StagingState::Empty);
        assert_eq!(staging.field_key(), key);
        assert_eq!(staging.drain(), None);
    }

    #[test]
    fn test_submit_stages_text_and_rotates_field() {
        let mut staging = InputStaging::new();
        let key = staging.field_key();
        staging.bind(key, " hello ").unwrap();

        assert!(staging.submit(key));
        assert_eq!(staging.state(), StagingState::Staged);
        assert_eq!(
            staging.pending(),
            &PendingSubmission {
                text: "hello".into(),
                flag: true
            }
        );
        assert_ne!(staging.field_key(), key);
        assert_eq!(staging.draft(), "");
    }

    #[test]
    fn test_retired_field_rejects_text_and_submit() {
        let mut staging = InputStaging::new();
        let old = staging.field_key();
        staging.bind(old, "first").unwrap();
        staging.submit(old);

        assert_eq!(staging.bind(old, "stale"), Err(RetiredField(old)));
        assert!(!staging.submit(old));
        assert_eq!(staging.draft(), "");
    }

    #[test]
    fn test_drain_yields_exactly_once() {
        let mut staging = InputStaging::new();
        let key = staging.field_key();
        staging.bind(key, "once").unwrap();
        staging.submit(key);

        assert_eq!(staging.drain().as_deref(), Some("once"));
        assert_eq!(staging.state(), StagingState::Idle);
        assert_eq!(staging.pending(), &PendingSubmission::default());
        assert_eq!(staging.drain(), None);
    }

    #[test]
    fn test_bind_after_drain_returns_to_empty() {
        let mut staging = InputStaging::new();
        let key = staging.field_key();
        staging.bind(key, "first").unwrap();
        staging.submit(key);
        staging.drain();

        let next = staging.field_key();
        staging.bind(next, "  ").unwrap();
        assert_eq!(staging.state(), StagingState::Empty);
        assert!(!staging.submit(next));
        assert_eq!(staging.state(), StagingState::Empty);

        staging.bind(next, "second").unwrap();
        assert!(staging.submit(next));
        assert_eq!(staging.state(), StagingState::Staged);
    }

    #[test]
    fn test_bind_while_staged_keeps_submission() {
        let mut staging = InputStaging::new();
        let key = staging.field_key();
        staging.bind(key, "waiting").unwrap();
        staging.submit(key);

        staging.bind(staging.field_key(), "typing ahead").unwrap();

        assert_eq!(staging.state(), StagingState::Staged);
        assert_eq!(staging.drain().as_deref(), Some("waiting"));
    }

    #[test]
    fn test_keys_are_never_reused() {
        let mut staging = InputStaging::new();
        let mut seen = vec![staging.field_key()];
        for i in 0..5 {
            let key = staging.field_key();
            staging.bind(key, format!("msg {i}")).unwrap();
            staging.submit(key);
            staging.drain();
            staging.reset();
            seen.push(staging.field_key());
        }
        let mut unique = seen.clone();
        unique.dedup();
        assert_eq!(unique, seen);
        assert_eq!(staging.field_key().to_string(), "draft_10");
    }

    #[test]
    fn test_reset_discards_pending_submission() {
        let mut staging = InputStaging::new();
        let key = staging.field_key();
        staging.bind(key, "never sent").unwrap();
        staging.submit(key);

        staging.reset();

        assert_eq!(staging.state(), StagingState::Empty);
        assert_eq!(staging.drain(), None);
    }
}
