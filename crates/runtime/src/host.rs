//! Collaborators provided by the host platform.
//!
//! The runtime never talks to the OS directly. A host implements these traits
//! (the real platform glue, the CLI bridge, or a test fake) and hands them in.

use policy::SourceKind;
use storage::StoredMessage;
use thiserror::Error;

use crate::history::HistoryQuery;
use crate::sender::AckPair;

/// A registration call into the OS failed.
#[derive(Debug, Clone, Error)]
#[error("{kind} source: {message}")]
pub struct HostError {
    pub kind: SourceKind,
    pub message: String,
}

impl HostError {
    pub fn new(kind: SourceKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The transport refused or failed a submission.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The OS store could not be read.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// OS-level event registration (receivers and notification callbacks).
pub trait EventSource: Send + Sync {
    /// Start delivering raw events of this kind.
    fn register(&self, kind: SourceKind) -> Result<(), HostError>;

    /// Stop delivering raw events of this kind.
    fn unregister(&self, kind: SourceKind) -> Result<(), HostError>;

    /// Whether the user granted notification-listener access.
    fn has_notification_access(&self) -> bool {
        true
    }
}

/// OS-level outbound message transport.
pub trait MessageTransport: Send + Sync {
    /// Split a body into carrier-sized parts.
    fn divide_message(&self, body: &str) -> Vec<String>;

    /// Submit a single-part message without acknowledgment tracking.
    fn send_text(&self, destination: &str, body: &str) -> Result<(), TransportError>;

    /// Submit an ordered multipart message with one acknowledgment pair per part.
    fn send_multipart(
        &self,
        destination: &str,
        parts: &[String],
        acks: &[AckPair],
    ) -> Result<(), TransportError>;
}

/// Read-only view of the OS message store.
pub trait HistorySource: Send + Sync {
    /// Records matching the query, newest first.
    fn query(&self, query: &HistoryQuery) -> Result<Vec<StoredMessage>, StoreError>;
}
