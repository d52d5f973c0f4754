//! Source listeners: one per OS event source.
//!
//! A listener owns the OS registration of its source and turns raw payloads
//! into [`CapturedEvent`]s. Malformed or filtered payloads produce no events;
//! they are logged and never surface as errors.

mod notification;
mod sms;

pub use notification::NotificationListener;
pub use sms::SmsListener;

use std::sync::{Arc, Mutex, PoisonError};

use policy::SourceKind;
use tracing::{debug, info, warn};

use crate::event::{CapturedEvent, RawEvent};
use crate::host::{EventSource, HostError};

/// A single capture source.
pub trait SourceListener: Send + Sync {
    /// The kind of raw events this listener handles.
    fn kind(&self) -> SourceKind;

    /// Whether the listener is currently registered with the OS.
    fn is_active(&self) -> bool;

    /// Register with the OS. A no-op when already active.
    fn activate(&self) -> Result<(), HostError>;

    /// Deregister from the OS. A no-op when already inactive.
    ///
    /// The listener is inactive afterwards even if the OS call fails.
    fn deactivate(&self) -> Result<(), HostError>;

    /// Normalize one raw payload. An empty result means it was filtered.
    fn on_raw_event(&self, raw: &RawEvent) -> Vec<CapturedEvent>;
}

/// OS registration state shared by the listener implementations.
struct Registration {
    kind: SourceKind,
    source: Arc<dyn EventSource>,
    active: Mutex<bool>,
}

impl Registration {
    fn new(kind: SourceKind, source: Arc<dyn EventSource>) -> Self {
        Self {
            kind,
            source,
            active: Mutex::new(false),
        }
    }

    fn is_active(&self) -> bool {
        *self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn activate(&self) -> Result<(), HostError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if *active {
            return Ok(());
        }
        self.source.register(self.kind)?;
        *active = true;
        info!(source = %self.kind, "listener registered");
        Ok(())
    }

    fn deactivate(&self) -> Result<(), HostError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if !*active {
            debug!(source = %self.kind, "listener not registered, nothing to deregister");
            return Ok(());
        }
        *active = false;
        match self.source.unregister(self.kind) {
            Ok(()) => {
                info!(source = %self.kind, "listener deregistered");
                Ok(())
            }
            Err(e) => {
                warn!(source = %self.kind, error = %e, "deregistration failed");
                Err(e)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::FakeSource;
    use super::*;

    #[test]
    fn activate_is_idempotent() {
        let source = Arc::new(FakeSource::default());
        let registration = Registration::new(SourceKind::Sms, source.clone());
        registration.activate().unwrap();
        registration.activate().unwrap();
        assert!(registration.is_active());
        assert_eq!(source.calls(), vec![("register", SourceKind::Sms)]);
    }

    #[test]
    fn deactivate_inactive_does_not_call_os() {
        let source = Arc::new(FakeSource::default());
        let registration = Registration::new(SourceKind::Sms, source.clone());
        registration.deactivate().unwrap();
        assert!(source.calls().is_empty());
    }

    #[test]
    fn failed_deregistration_still_clears_state() {
        let source = Arc::new(FakeSource::default());
        *source.fail_unregister.lock().unwrap() = true;
        let registration = Registration::new(SourceKind::Notification, source.clone());
        registration.activate().unwrap();

        assert!(registration.deactivate().is_err());
        assert!(!registration.is_active());
        // Second call sees the cleared state and does not hit the OS again.
        registration.deactivate().unwrap();
        assert_eq!(source.calls().len(), 2);
    }

    #[test]
    fn failed_registration_stays_inactive() {
        let source = Arc::new(FakeSource::default());
        *source.fail_register.lock().unwrap() = Some(SourceKind::Notification);
        let registration = Registration::new(SourceKind::Notification, source);
        assert!(registration.activate().is_err());
        assert!(!registration.is_active());
    }
}
