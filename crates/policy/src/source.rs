use serde::{Deserialize, Serialize};

/// The OS-level sources events can be captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Sms,
    Notification,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Sms => "sms",
            SourceKind::Notification => "notification",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to accept an event from a given origin.
#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub kind: SourceKind,
    pub origin: String, // phone number or package name
}

impl SourceRequest {
    pub fn new(kind: SourceKind, origin: impl Into<String>) -> Self {
        Self {
            kind,
            origin: origin.into(),
        }
    }

    pub fn sms(sender: impl Into<String>) -> Self {
        Self::new(SourceKind::Sms, sender)
    }

    pub fn notification(package: impl Into<String>) -> Self {
        Self::new(SourceKind::Notification, package)
    }
}
