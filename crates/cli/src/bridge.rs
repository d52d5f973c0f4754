//! Host side of the stdio bridge.
//!
//! Stands in for the platform: registrations are bookkeeping, outbound
//! messages land in the local store as sent, and every acknowledgment
//! succeeds once the caller collects it.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use policy::SourceKind;
use runtime::{
    AckOutcome, AckPair, EventSource, HostError, MessageTransport, MultipartSender, PduDecoder,
    RawSmsBundle, TransportError, gsm_septet_count,
};
use storage::{MessageStore, NewMessage};
use tracing::{debug, info, warn};

const GSM_SINGLE: usize = 160;
const GSM_CONCAT: usize = 153;
const UCS2_SINGLE: usize = 70;
const UCS2_CONCAT: usize = 67;

pub struct BridgeHost {
    store: Arc<MessageStore>,
    registered: Mutex<HashSet<SourceKind>>,
    acks: Mutex<Vec<AckPair>>,
}

impl BridgeHost {
    pub fn new(store: Arc<MessageStore>) -> Self {
        Self {
            store,
            registered: Mutex::new(HashSet::new()),
            acks: Mutex::new(Vec::new()),
        }
    }

    fn registered(&self) -> MutexGuard<'_, HashSet<SourceKind>> {
        self.registered.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Acknowledgment pairs submitted since the last call.
    pub fn take_acks(&self) -> Vec<AckPair> {
        std::mem::take(&mut *self.acks.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Store a received bundle in the inbox, like the platform does before
    /// broadcasting it. Returns the number of messages stored.
    pub fn record_inbound(&self, bundle: &RawSmsBundle, decoder: &dyn PduDecoder) -> usize {
        let mut stored = 0;
        for pdu in &bundle.pdus {
            let decoded = match pdu
                .to_bytes()
                .and_then(|bytes| decoder.decode(&bytes, bundle.format.as_deref()))
            {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(error = %e, "undecodable pdu not stored");
                    continue;
                }
            };
            let message = NewMessage::received(
                decoded.originating_address,
                decoded.body,
                decoded.timestamp_millis,
            );
            match self.store.insert(&message) {
                Ok(_) => stored += 1,
                Err(e) => debug!(error = %e, "failed to store inbound message"),
            }
        }
        stored
    }

    fn record_sent(&self, destination: &str, body: &str) -> Result<(), TransportError> {
        let message = NewMessage::sent(destination, body, Utc::now().timestamp_millis());
        self.store
            .insert(&message)
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(())
    }
}

impl EventSource for BridgeHost {
    fn register(&self, kind: SourceKind) -> Result<(), HostError> {
        self.registered().insert(kind);
        info!(source = %kind, "bridge source registered");
        Ok(())
    }

    fn unregister(&self, kind: SourceKind) -> Result<(), HostError> {
        if !self.registered().remove(&kind) {
            return Err(HostError::new(kind, "not registered"));
        }
        info!(source = %kind, "bridge source unregistered");
        Ok(())
    }
}

impl MessageTransport for BridgeHost {
    fn divide_message(&self, body: &str) -> Vec<String> {
        split_message(body)
    }

    fn send_text(&self, destination: &str, body: &str) -> Result<(), TransportError> {
        self.record_sent(destination, body)
    }

    fn send_multipart(
        &self,
        destination: &str,
        parts: &[String],
        acks: &[AckPair],
    ) -> Result<(), TransportError> {
        self.record_sent(destination, &parts.concat())?;
        self.acks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(acks);
        Ok(())
    }
}

/// Report every collected acknowledgment as successful.
pub fn settle_acks(host: &BridgeHost, sender: &MultipartSender) {
    for pair in host.take_acks() {
        sender.acknowledge(pair.sent, AckOutcome::Ok);
        sender.acknowledge(pair.delivered, AckOutcome::Ok);
    }
}

/// Split a body into carrier-sized parts.
///
/// GSM 7-bit text fits 160 septets in one part and 153 per part once
/// concatenated; anything else is UCS-2 with 70 and 67 code units.
pub fn split_message(body: &str) -> Vec<String> {
    match gsm_septet_count(body) {
        Some(septets) if septets <= GSM_SINGLE => vec![body.to_string()],
        Some(_) => chunk(body, GSM_CONCAT, |c| {
            gsm_septet_count(c.encode_utf8(&mut [0; 4])).unwrap_or(1)
        }),
        None if body.encode_utf16().count() <= UCS2_SINGLE => vec![body.to_string()],
        None => chunk(body, UCS2_CONCAT, char::len_utf16),
    }
}

// Characters are never split across parts, so a part may end short.
fn chunk(body: &str, limit: usize, cost: impl Fn(char) -> usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut used = 0;
    for c in body.chars() {
        let c_cost = cost(c);
        if used + c_cost > limit {
            parts.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(c);
        used += c_cost;
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}
