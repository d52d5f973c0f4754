//! Line-delimited JSON framing for the stdio bridge.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{EventFrame, MethodResponse, RequestId};

/// Maximum size of a single frame (1MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// A frame written to the subscriber side of the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    /// Answer to a method call.
    Reply {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<RequestId>,
        response: MethodResponse,
    },
    /// A captured event.
    Event { event: EventFrame },
}

/// Decode one line into a frame.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    if line.len() > MAX_FRAME_SIZE {
        return Err(Error::FrameTooLarge {
            size: line.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    Ok(serde_json::from_str(line.trim())?)
}

/// Encode a frame as one line, including the trailing newline.
pub fn encode_line<T: Serialize>(frame: &T) -> Result<String> {
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MethodCall;
    use policy::SourceKind;

    #[test]
    fn event_frame_uses_camel_case() {
        let frame = Outbound::Event {
            event: EventFrame {
                source_kind: SourceKind::Sms,
                origin_id: "1588".into(),
                title: None,
                body: "hi".into(),
                timestamp_millis: 42,
            },
        };
        let line = encode_line(&frame).unwrap();
        assert!(line.ends_with('\n'));
        assert!(line.contains("\"originId\":\"1588\""));
        assert!(line.contains("\"timestampMillis\":42"));
        assert!(line.contains("\"sourceKind\":\"sms\""));
        assert!(!line.contains("title"));
    }

    #[test]
    fn decode_rejects_oversized_lines() {
        let line = "x".repeat(MAX_FRAME_SIZE + 1);
        let err = decode_line::<MethodCall>(&line).unwrap_err();
        assert!(matches!(err, Error::FrameTooLarge { .. }));
    }

    #[test]
    fn decode_reply_roundtrip_keeps_id() {
        let line = r#"{"type":"reply","id":"a1","response":{"status":"success","result":true}}"#;
        let frame: Outbound = decode_line(line).unwrap();
        match frame {
            Outbound::Reply { id, response } => {
                assert_eq!(id, Some(RequestId::from("a1")));
                assert!(response.is_success());
            }
            Outbound::Event { .. } => panic!("expected reply"),
        }
    }
}
