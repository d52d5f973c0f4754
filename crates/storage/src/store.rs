//! SQLite message store implementation.

use crate::{NewMessage, Result, StoredMessage};
use rusqlite::{Connection, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// SQLite-backed message store.
pub struct MessageStore {
    conn: Mutex<Connection>,
}

impl MessageStore {
    /// Open or create a message store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory message store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn().execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS sms (
                _id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                body TEXT NOT NULL,
                date INTEGER NOT NULL,
                type INTEGER NOT NULL,
                read INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_sms_address
                ON sms(address, date);
            "#,
        )?;
        Ok(())
    }

    /// Insert a message and return its row id.
    pub fn insert(&self, message: &NewMessage) -> Result<i64> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO sms (address, body, date, type, read) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.address,
                message.body,
                message.date,
                message.message_type,
                message.read,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Load up to `limit` messages, newest first, optionally for one address.
    pub fn query(&self, address: Option<&str>, limit: usize) -> Result<Vec<StoredMessage>> {
        let conn = self.conn();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let messages = match address {
            Some(address) => {
                let mut stmt = conn.prepare(
                    "SELECT _id, address, body, date, type, read FROM sms
                     WHERE address = ?1 ORDER BY date DESC, _id DESC LIMIT ?2",
                )?;
                stmt.query_map(params![address, limit], row_to_message)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT _id, address, body, date, type, read FROM sms
                     ORDER BY date DESC, _id DESC LIMIT ?1",
                )?;
                stmt.query_map(params![limit], row_to_message)?
                    .collect::<rusqlite::Result<Vec<_>>>()?
            }
        };

        Ok(messages)
    }
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<StoredMessage> {
    Ok(StoredMessage {
        id: row.get(0)?,
        address: row.get(1)?,
        body: row.get(2)?,
        date: row.get(3)?,
        message_type: row.get(4)?,
        read: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TYPE_INBOX, TYPE_SENT};

    fn seeded() -> MessageStore {
        let store = MessageStore::in_memory().unwrap();
        store.insert(&NewMessage::received("1588", "first", 1_000)).unwrap();
        store.insert(&NewMessage::sent("1588", "second", 2_000)).unwrap();
        store.insert(&NewMessage::received("010", "third", 3_000)).unwrap();
        store.insert(&NewMessage::received("1588", "fourth", 4_000)).unwrap();
        store
    }

    #[test]
    fn query_orders_newest_first() {
        let store = seeded();
        let bodies: Vec<_> = store
            .query(None, 10)
            .unwrap()
            .into_iter()
            .map(|m| m.body)
            .collect();
        assert_eq!(bodies, ["fourth", "third", "second", "first"]);
    }

    #[test]
    fn query_filters_by_address_and_limits() {
        let store = seeded();
        let messages = store.query(Some("1588"), 2).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].body, "fourth");
        assert_eq!(messages[1].body, "second");
        assert_eq!(messages[1].message_type, TYPE_SENT);
    }

    #[test]
    fn insert_keeps_flags() {
        let store = MessageStore::in_memory().unwrap();
        let id = store.insert(&NewMessage::received("010", "hi", 5)).unwrap();
        let messages = store.query(None, 1).unwrap();
        assert_eq!(messages[0].id, id);
        assert_eq!(messages[0].message_type, TYPE_INBOX);
        assert!(!messages[0].read);
    }

    #[test]
    fn unknown_address_is_empty() {
        let store = seeded();
        assert!(store.query(Some("999"), 10).unwrap().is_empty());
    }
}
