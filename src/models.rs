//! # Database models
//!
//! Row types for the append-only `chat_messages` log (see `crate::schema`).
//!
//! - [`NewTurnRecord`]: what the persistence adapter inserts, one per turn.
//! - [`TurnRecord`]: a row read back, used by the `transcript` command.
//!
//! Rows are never updated or deleted.
use diesel::prelude::*;

/// One turn ready to be appended to the log.
///
/// `timestamp` is UTC, formatted `YYYY-MM-DD HH:MM:SS`.
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::chat_messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct NewTurnRecord {
    pub conversation_id: String,
    pub timestamp: String,
    pub role: String,
    pub content: String,
}

/// A persisted turn.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::chat_messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TurnRecord {
    /// Auto-increment primary key (set by the DB on insert).
    pub id: i32,
    pub conversation_id: String,
    pub timestamp: String,
    /// `"user"` or `"assistant"`.
    pub role: String,
    pub content: String,
}
