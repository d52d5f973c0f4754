//! Message rows as kept by the host message store.

/// `type` value of a message in the inbox.
pub const TYPE_INBOX: i64 = 1;
/// `type` value of a message that was sent from this device.
pub const TYPE_SENT: i64 = 2;

/// A stored message row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub id: i64,
    /// Phone number of the other party.
    pub address: String,
    pub body: String,
    /// Milliseconds since the Unix epoch.
    pub date: i64,
    /// Box the message lives in (inbox, sent, outbox, ...).
    pub message_type: i64,
    pub read: bool,
}

/// A message to be written to the store.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub address: String,
    pub body: String,
    pub date: i64,
    pub message_type: i64,
    pub read: bool,
}

impl NewMessage {
    pub fn received(address: impl Into<String>, body: impl Into<String>, date: i64) -> Self {
        Self {
            address: address.into(),
            body: body.into(),
            date,
            message_type: TYPE_INBOX,
            read: false,
        }
    }

    pub fn sent(address: impl Into<String>, body: impl Into<String>, date: i64) -> Self {
        Self {
            address: address.into(),
            body: body.into(),
            date,
            message_type: TYPE_SENT,
            read: true,
        }
    }
}
