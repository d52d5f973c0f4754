//! Captured events and the raw OS payloads they are built from.

use policy::SourceKind;
use protocol::EventFrame;
use serde::{Deserialize, Serialize};

use crate::pdu::DecodeError;

/// A normalized event from one of the capture sources.
///
/// Fields are private: once built by a listener the event is never changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    source_kind: SourceKind,
    origin_id: String,
    title: Option<String>,
    body: String,
    timestamp_millis: i64,
}

impl CapturedEvent {
    /// An inbound short message.
    pub fn sms(sender: impl Into<String>, body: impl Into<String>, timestamp_millis: i64) -> Self {
        Self {
            source_kind: SourceKind::Sms,
            origin_id: sender.into(),
            title: None,
            body: body.into(),
            timestamp_millis,
        }
    }

    /// A posted notification. An empty title is stored as no title.
    pub fn notification(
        package: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            source_kind: SourceKind::Notification,
            origin_id: package.into(),
            title: Some(title.into()).filter(|t| !t.is_empty()),
            body: body.into(),
            timestamp_millis,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    /// Phone number or package name.
    pub fn origin_id(&self) -> &str {
        &self.origin_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }

    pub fn to_frame(&self) -> EventFrame {
        EventFrame {
            source_kind: self.source_kind,
            origin_id: self.origin_id.clone(),
            title: self.title.clone(),
            body: self.body.clone(),
            timestamp_millis: self.timestamp_millis,
        }
    }
}

/// A raw payload handed over by an OS callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RawEvent {
    Sms(RawSmsBundle),
    Notification(RawNotification),
}

impl RawEvent {
    pub fn kind(&self) -> SourceKind {
        match self {
            RawEvent::Sms(_) => SourceKind::Sms,
            RawEvent::Notification(_) => SourceKind::Notification,
        }
    }
}

/// The protocol data units of one "message received" broadcast.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSmsBundle {
    #[serde(default)]
    pub pdus: Vec<Pdu>,
    /// "3gpp" or "3gpp2".
    #[serde(default)]
    pub format: Option<String>,
}

/// One raw PDU, hex-encoded as handed over.
///
/// The hex is checked when the unit is decoded, not when the bundle is
/// parsed, so a bad unit only costs itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pdu(String);

impl Pdu {
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{b:02X}")).collect())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// The raw octets. Whitespace between digits is ignored.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        let digits: Vec<u8> = self.0.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        if digits.len() % 2 != 0 {
            return Err(DecodeError::InvalidHex(format!(
                "odd number of hex digits ({})",
                digits.len()
            )));
        }
        digits
            .chunks(2)
            .map(|pair| {
                let text = std::str::from_utf8(pair)
                    .map_err(|_| DecodeError::InvalidHex("non-ascii digit".into()))?;
                u8::from_str_radix(text, 16)
                    .map_err(|_| DecodeError::InvalidHex(format!("invalid hex byte {text:?}")))
            })
            .collect()
    }
}

/// The fields extracted from a posted notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    pub package_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Short body.
    #[serde(default)]
    pub text: Option<String>,
    /// Expanded body.
    #[serde(default)]
    pub big_text: Option<String>,
    #[serde(default)]
    pub posted_at_millis: Option<i64>,
}
