//! # Persistence adapter
//!
//! Appends each turn to the `chat_messages` log. Writes are best-effort: the
//! controller turns any error from [`TurnStore::save`] into a warning and the
//! conversation continues from its in-memory history.
//!
//! All values go through Diesel's bound parameters; content is never spliced
//! into SQL text, so quotes and delimiters in a message need no escaping.
//!
//! ```no_run
//! use frost_chat::history::Role;
//! use frost_chat::persistence::{SqliteTurnStore, TurnStore};
//!
//! # fn demo() -> Result<(), frost_chat::error::ChatError> {
//! let mut store = SqliteTurnStore::open("frost.db")?;
//! store.save("3f1c…", Role::User, "Bonjour")?;
//! # Ok(()) }
//! ```

use chrono::{DateTime, Utc};
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use tracing::debug;

use crate::{
    error::Result,
    history::Role,
    models::{NewTurnRecord, TurnRecord},
    schema::chat_messages,
};

/// Timestamp layout stored in the log.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        conversation_id TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS chat_messages_conversation_id
        ON chat_messages (conversation_id);
";

/// Append-only sink for conversation turns.
pub trait TurnStore: Send {
    /// Append one turn for `conversation_id`, stamped with the current UTC time.
    fn save(&mut self, conversation_id: &str, role: Role, content: &str) -> Result<()>;
}

/// Format a UTC instant the way the log stores it (second precision).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Build the row for a turn without writing it.
pub fn new_record(conversation_id: &str, role: Role, content: &str, at: DateTime<Utc>) -> NewTurnRecord {
    NewTurnRecord {
        conversation_id: conversation_id.to_string(),
        timestamp: format_timestamp(at),
        role: role.as_str().to_string(),
        content: content.to_string(),
    }
}

/// [`TurnStore`] backed by a SQLite database.
pub struct SqliteTurnStore {
    connection: SqliteConnection,
}

impl SqliteTurnStore {
    /// Connect to `db_url` and make sure the log table exists.
    pub fn open(db_url: &str) -> Result<Self> {
        debug!("Opening message log at {}", db_url);
        let mut connection = SqliteConnection::establish(db_url)?;
        connection.batch_execute(CREATE_TABLE_SQL)?;
        Ok(Self { connection })
    }

    /// Insert a prepared row inside its own transaction.
    pub fn insert(&mut self, record: &NewTurnRecord) -> Result<()> {
        self.connection.transaction(|conn| {
            diesel::insert_into(chat_messages::table)
                .values(record)
                .execute(conn)
        })?;
        Ok(())
    }

    /// All rows of a conversation, oldest first.
    pub fn conversation_records(&mut self, conversation_id: &str) -> Result<Vec<TurnRecord>> {
        let records = chat_messages::table
            .filter(chat_messages::conversation_id.eq(conversation_id))
            .order(chat_messages::id.asc())
            .select(TurnRecord::as_select())
            .load(&mut self.connection)?;
        Ok(records)
    }
}

impl TurnStore for SqliteTurnStore {
    fn save(&mut self, conversation_id: &str, role: Role, content: &str) -> Result<()> {
        let record = new_record(conversation_id, role, content, Utc::now());
        self.insert(&record)?;
        debug!("Saved {} turn for conversation {}", role, conversation_id);
        Ok(())
    }
}
