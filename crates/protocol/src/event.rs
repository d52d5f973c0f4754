//! Event stream frames.

use policy::SourceKind;
use serde::{Deserialize, Serialize};

/// One item delivered on the event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventFrame {
    pub source_kind: SourceKind,
    pub origin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    pub timestamp_millis: i64,
}
