//! History queries against the host message store.

use serde::{Deserialize, Serialize};
use storage::{MessageStore, StoredMessage, TYPE_INBOX};

use crate::host::{HistorySource, StoreError};
use crate::{Error, Result};

/// Number of records returned when the caller gives no limit.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Which messages to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Only messages exchanged with this phone number.
    pub origin_id: Option<String>,
    pub limit: usize,
}

impl HistoryQuery {
    pub fn new(origin_id: Option<String>, limit: usize) -> Self {
        Self { origin_id, limit }
    }
}

impl Default for HistoryQuery {
    fn default() -> Self {
        Self::new(None, DEFAULT_HISTORY_LIMIT)
    }
}

/// Whether a message was sent from or received by this device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// One historical message as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i64,
    pub origin_id: String,
    pub body: String,
    pub timestamp_millis: i64,
    pub direction: Direction,
    pub is_read: bool,
}

impl From<StoredMessage> for HistoryRecord {
    fn from(message: StoredMessage) -> Self {
        // Only the inbox holds received messages; sent, outbox, queued and
        // failed boxes are all outgoing.
        let direction = if message.message_type == TYPE_INBOX {
            Direction::Received
        } else {
            Direction::Sent
        };
        Self {
            id: message.id,
            origin_id: message.address,
            body: message.body,
            timestamp_millis: message.date,
            direction,
            is_read: message.read,
        }
    }
}

/// Run a query and project the rows, newest first, at most `query.limit`.
pub fn read_history(source: &dyn HistorySource, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut rows = source
        .query(query)
        .map_err(|e| Error::ReadFailed(e.to_string()))?;

    // Stores are asked for descending order; don't trust them to honor it.
    rows.sort_by(|a, b| b.date.cmp(&a.date));
    rows.truncate(query.limit);

    Ok(rows.into_iter().map(HistoryRecord::from).collect())
}

impl HistorySource for MessageStore {
    fn query(&self, query: &HistoryQuery) -> std::result::Result<Vec<StoredMessage>, StoreError> {
        MessageStore::query(self, query.origin_id.as_deref(), query.limit)
            .map_err(|e| StoreError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::NewMessage;

    struct BrokenStore;

    impl HistorySource for BrokenStore {
        fn query(&self, _query: &HistoryQuery) -> std::result::Result<Vec<StoredMessage>, StoreError> {
            Err(StoreError("permission denied: READ_SMS".into()))
        }
    }

    fn store_with_five() -> MessageStore {
        let store = MessageStore::in_memory().unwrap();
        for i in 1..=5 {
            let message = if i % 2 == 0 {
                NewMessage::sent("1588", format!("m{i}"), i * 1_000)
            } else {
                NewMessage::received("1588", format!("m{i}"), i * 1_000)
            };
            store.insert(&message).unwrap();
        }
        store
    }

    #[test]
    fn limit_two_returns_two_newest() {
        let store = store_with_five();
        let records = read_history(&store, &HistoryQuery::new(None, 2)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].body, "m5");
        assert_eq!(records[1].body, "m4");
    }

    #[test]
    fn direction_follows_message_type() {
        let store = store_with_five();
        let records = read_history(&store, &HistoryQuery::default()).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].direction, Direction::Received);
        assert_eq!(records[1].direction, Direction::Sent);
    }

    #[test]
    fn read_flag_is_carried_through() {
        let store = MessageStore::in_memory().unwrap();
        let mut read = NewMessage::received("010", "seen", 10);
        read.read = true;
        store.insert(&read).unwrap();
        store.insert(&NewMessage::received("010", "unseen", 20)).unwrap();

        let records = read_history(&store, &HistoryQuery::new(Some("010".into()), 10)).unwrap();
        assert!(!records[0].is_read);
        assert!(records[1].is_read);
    }

    #[test]
    fn store_failure_is_read_failed() {
        let err = read_history(&BrokenStore, &HistoryQuery::default()).unwrap_err();
        assert!(matches!(err, Error::ReadFailed(msg) if msg.contains("READ_SMS")));
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = HistoryRecord {
            id: 1,
            origin_id: "010".into(),
            body: "hi".into(),
            timestamp_millis: 5,
            direction: Direction::Sent,
            is_read: true,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["originId"], "010");
        assert_eq!(json["timestampMillis"], 5);
        assert_eq!(json["direction"], "sent");
        assert_eq!(json["isRead"], true);
    }
}
