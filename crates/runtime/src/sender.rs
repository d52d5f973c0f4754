//! Outbound messages, split into parts with per-part acknowledgment tracking.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::host::MessageTransport;
use crate::{Error, Result};

/// A message to send.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub destination: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn new(destination: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    Sent,
    Delivered,
}

/// Identifies one expected acknowledgment of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AckHandle {
    pub message_id: Uuid,
    pub part_index: usize,
    pub kind: AckKind,
}

/// The sent and delivered handles of one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPair {
    pub sent: AckHandle,
    pub delivered: AckHandle,
}

impl AckPair {
    fn new(message_id: Uuid, part_index: usize) -> Self {
        let handle = |kind| AckHandle {
            message_id,
            part_index,
            kind,
        };
        Self {
            sent: handle(AckKind::Sent),
            delivered: handle(AckKind::Delivered),
        }
    }
}

/// What the transport reported for one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    Ok,
    Failed(String),
}

/// Tracking state of one part of a multipart message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePart {
    pub sequence_index: usize,
    pub total_parts: usize,
    pub text: String,
    pub sent_acknowledged: bool,
    pub delivered_acknowledged: bool,
    pub failure: Option<String>,
}

impl MessagePart {
    /// Sent and delivered, or failed.
    pub fn is_terminal(&self) -> bool {
        self.failure.is_some() || (self.sent_acknowledged && self.delivered_acknowledged)
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// Set only for multipart messages, which are tracked.
    pub message_id: Option<Uuid>,
    pub total_parts: usize,
}

/// Submits outbound messages and tracks multipart acknowledgments.
pub struct MultipartSender {
    transport: Arc<dyn MessageTransport>,
    pending: Mutex<HashMap<Uuid, Vec<MessagePart>>>,
}

impl MultipartSender {
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self {
            transport,
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<Uuid, Vec<MessagePart>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Submit a message. Returns as soon as the transport accepted it;
    /// acknowledgments arrive later through [`acknowledge`](Self::acknowledge).
    pub fn send(&self, message: &OutboundMessage) -> Result<SendReceipt> {
        let mut parts = self.transport.divide_message(&message.body);
        if parts.is_empty() {
            parts.push(message.body.clone());
        }

        if parts.len() == 1 {
            self.transport
                .send_text(&message.destination, &message.body)
                .map_err(|e| Error::SendFailed(e.to_string()))?;
            info!(destination = %message.destination, "message submitted");
            return Ok(SendReceipt {
                message_id: None,
                total_parts: 1,
            });
        }

        let message_id = Uuid::new_v4();
        let total_parts = parts.len();
        let acks: Vec<AckPair> = (0..total_parts)
            .map(|index| AckPair::new(message_id, index))
            .collect();
        let tracked = parts
            .iter()
            .enumerate()
            .map(|(sequence_index, text)| MessagePart {
                sequence_index,
                total_parts,
                text: text.clone(),
                sent_acknowledged: false,
                delivered_acknowledged: false,
                failure: None,
            })
            .collect();

        // Track before submitting so an early callback finds its part.
        self.pending().insert(message_id, tracked);

        if let Err(e) = self
            .transport
            .send_multipart(&message.destination, &parts, &acks)
        {
            self.pending().remove(&message_id);
            return Err(Error::SendFailed(e.to_string()));
        }

        info!(
            destination = %message.destination,
            %message_id,
            parts = total_parts,
            "multipart message submitted"
        );
        Ok(SendReceipt {
            message_id: Some(message_id),
            total_parts,
        })
    }

    /// Record a sent/delivered callback from the transport.
    ///
    /// Failures are logged only; the caller of `send` already has its result.
    pub fn acknowledge(&self, handle: AckHandle, outcome: AckOutcome) {
        let mut pending = self.pending();

        let Some(parts) = pending.get_mut(&handle.message_id) else {
            debug!(message_id = %handle.message_id, "acknowledgment for untracked message");
            return;
        };
        let Some(part) = parts.get_mut(handle.part_index) else {
            warn!(
                message_id = %handle.message_id,
                part = handle.part_index,
                "acknowledgment for unknown part"
            );
            return;
        };

        match outcome {
            AckOutcome::Ok => match handle.kind {
                AckKind::Sent => part.sent_acknowledged = true,
                AckKind::Delivered => part.delivered_acknowledged = true,
            },
            AckOutcome::Failed(reason) => {
                warn!(
                    message_id = %handle.message_id,
                    part = handle.part_index,
                    kind = ?handle.kind,
                    %reason,
                    "message part failed"
                );
                part.failure = Some(reason);
            }
        }

        if parts.iter().all(MessagePart::is_terminal) {
            let failed = parts.iter().filter(|p| p.failure.is_some()).count();
            pending.remove(&handle.message_id);
            info!(message_id = %handle.message_id, failed, "multipart message settled");
        }
    }

    /// Snapshot of the parts of a message still being tracked.
    pub fn pending_parts(&self, message_id: Uuid) -> Option<Vec<MessagePart>> {
        self.pending().get(&message_id).cloned()
    }

    /// Number of multipart messages not yet settled.
    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::host::TransportError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Submission {
        Text {
            destination: String,
            body: String,
        },
        Multipart {
            destination: String,
            parts: Vec<String>,
            acks: Vec<AckPair>,
        },
    }

    /// Splits every `part_size` characters and records submissions.
    pub struct FakeTransport {
        pub part_size: usize,
        pub fail_with: Mutex<Option<String>>,
        pub submissions: Mutex<Vec<Submission>>,
    }

    impl FakeTransport {
        pub fn new(part_size: usize) -> Self {
            Self {
                part_size,
                fail_with: Mutex::new(None),
                submissions: Mutex::new(Vec::new()),
            }
        }

        pub fn submissions(&self) -> Vec<Submission> {
            self.submissions.lock().unwrap().clone()
        }

        fn check(&self) -> std::result::Result<(), TransportError> {
            match self.fail_with.lock().unwrap().clone() {
                Some(reason) => Err(TransportError(reason)),
                None => Ok(()),
            }
        }
    }

    impl MessageTransport for FakeTransport {
        fn divide_message(&self, body: &str) -> Vec<String> {
            let chars: Vec<char> = body.chars().collect();
            chars
                .chunks(self.part_size)
                .map(|chunk| chunk.iter().collect())
                .collect()
        }

        fn send_text(&self, destination: &str, body: &str) -> std::result::Result<(), TransportError> {
            self.check()?;
            self.submissions.lock().unwrap().push(Submission::Text {
                destination: destination.to_string(),
                body: body.to_string(),
            });
            Ok(())
        }

        fn send_multipart(
            &self,
            destination: &str,
            parts: &[String],
            acks: &[AckPair],
        ) -> std::result::Result<(), TransportError> {
            self.check()?;
            self.submissions.lock().unwrap().push(Submission::Multipart {
                destination: destination.to_string(),
                parts: parts.to_vec(),
                acks: acks.to_vec(),
            });
            Ok(())
        }
    }
}
