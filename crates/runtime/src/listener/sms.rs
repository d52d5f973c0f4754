//! Inbound short message listener.

use std::sync::Arc;

use policy::{Decision, Policy, SourceKind, SourceRequest};
use tracing::{debug, warn};

use super::{Registration, SourceListener};
use crate::event::{CapturedEvent, RawEvent};
use crate::host::{EventSource, HostError};
use crate::pdu::PduDecoder;

/// Turns "message received" broadcasts into one event per PDU.
pub struct SmsListener {
    registration: Registration,
    decoder: Arc<dyn PduDecoder>,
    policy: Arc<Policy>,
}

impl SmsListener {
    pub fn new(
        source: Arc<dyn EventSource>,
        decoder: Arc<dyn PduDecoder>,
        policy: Arc<Policy>,
    ) -> Self {
        Self {
            registration: Registration::new(SourceKind::Sms, source),
            decoder,
            policy,
        }
    }
}

impl SourceListener for SmsListener {
    fn kind(&self) -> SourceKind {
        SourceKind::Sms
    }

    fn is_active(&self) -> bool {
        self.registration.is_active()
    }

    fn activate(&self) -> Result<(), HostError> {
        self.registration.activate()
    }

    fn deactivate(&self) -> Result<(), HostError> {
        self.registration.deactivate()
    }

    fn on_raw_event(&self, raw: &RawEvent) -> Vec<CapturedEvent> {
        let RawEvent::Sms(bundle) = raw else {
            warn!(kind = %raw.kind(), "sms listener received a foreign event");
            return Vec::new();
        };

        if bundle.pdus.is_empty() {
            warn!("dropping sms broadcast without pdus");
            return Vec::new();
        }

        let format = bundle.format.as_deref();
        let mut events = Vec::with_capacity(bundle.pdus.len());

        for (index, pdu) in bundle.pdus.iter().enumerate() {
            let decoded = match pdu
                .to_bytes()
                .and_then(|bytes| self.decoder.decode(&bytes, format))
            {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!(index, error = %e, "dropping malformed pdu");
                    continue;
                }
            };

            let request = SourceRequest::sms(&decoded.originating_address);
            if let Decision::Deny { reason } = self.policy.check(&request) {
                debug!(index, %reason, "sms filtered");
                continue;
            }

            events.push(CapturedEvent::sms(
                decoded.originating_address,
                decoded.body,
                decoded.timestamp_millis,
            ));
        }

        events
    }
}
