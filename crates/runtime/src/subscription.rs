//! Subscription lifecycle: listeners run exactly while someone is subscribed.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::event::RawEvent;
use crate::host::HostError;
use crate::listener::SourceListener;
use crate::relay::{EventRelay, Subscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No subscriber, listeners deregistered.
    Idle,
    /// Subscriber attached, listeners registered.
    Active,
}

/// Ties listener registration to subscriber presence.
pub struct SubscriptionManager {
    relay: Arc<EventRelay>,
    listeners: Vec<Arc<dyn SourceListener>>,
    // Serializes subscribe/unsubscribe so each transition is atomic.
    transition: Mutex<()>,
}

impl SubscriptionManager {
    pub fn new(relay: Arc<EventRelay>, listeners: Vec<Arc<dyn SourceListener>>) -> Self {
        Self {
            relay,
            listeners,
            transition: Mutex::new(()),
        }
    }

    pub fn state(&self) -> SubscriptionState {
        if self.relay.is_attached() {
            SubscriptionState::Active
        } else {
            SubscriptionState::Idle
        }
    }

    /// Whether any listener is registered with the OS.
    pub fn is_listening(&self) -> bool {
        self.listeners.iter().any(|l| l.is_active())
    }

    /// Attach (or replace) the subscriber and register every inactive listener.
    ///
    /// A listener that fails to register is logged and left inactive; the
    /// others still start.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        let _transition = self.transition.lock().unwrap_or_else(PoisonError::into_inner);

        if self.relay.attach(subscriber).is_some() {
            info!("subscriber replaced");
        } else {
            info!("subscriber attached");
        }

        for listener in &self.listeners {
            if listener.is_active() {
                continue;
            }
            if let Err(e) = listener.activate() {
                warn!(source = %listener.kind(), error = %e, "failed to activate listener");
            }
        }
    }

    /// Detach the subscriber and deregister every listener.
    ///
    /// Bookkeeping is always cleared; the first OS deregistration error, if
    /// any, is returned afterwards.
    pub fn unsubscribe(&self) -> Result<(), HostError> {
        let _transition = self.transition.lock().unwrap_or_else(PoisonError::into_inner);

        if self.relay.detach().is_some() {
            info!("subscriber detached");
        }

        let mut first_error = None;
        for listener in &self.listeners {
            if let Err(e) = listener.deactivate() {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Force the manager to idle on teardown, ignoring deregistration errors.
    pub fn shutdown(&self) {
        if let Err(e) = self.unsubscribe() {
            warn!(error = %e, "ignoring deregistration error during shutdown");
        }
    }

    /// Entry point for OS callbacks. Returns the number of events delivered.
    pub fn handle_raw_event(&self, raw: &RawEvent) -> usize {
        let kind = raw.kind();
        let Some(listener) = self.listeners.iter().find(|l| l.kind() == kind) else {
            warn!(source = %kind, "no listener for raw event");
            return 0;
        };

        if !listener.is_active() {
            debug!(source = %kind, "listener inactive, raw event dropped");
            return 0;
        }

        listener
            .on_raw_event(raw)
            .into_iter()
            .map(|event| self.relay.publish(event))
            .filter(|delivered| *delivered)
            .count()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RawNotification, RawSmsBundle};
    use crate::listener::testing::FakeSource;
    use crate::listener::{NotificationListener, SmsListener};
    use crate::pdu::GsmPduDecoder;
    use crate::relay::testing::Collector;
    use policy::{Policy, SourceKind};

    fn manager(source: &Arc<FakeSource>) -> SubscriptionManager {
        let policy = Arc::new(Policy::default());
        let listeners: Vec<Arc<dyn SourceListener>> = vec![
            Arc::new(SmsListener::new(source.clone(), Arc::new(GsmPduDecoder), policy.clone())),
            Arc::new(NotificationListener::new(source.clone(), policy)),
        ];
        SubscriptionManager::new(Arc::new(EventRelay::new()), listeners)
    }

    fn kakao(text: &str) -> RawEvent {
        RawEvent::Notification(RawNotification {
            package_name: Some("com.kakao.talk".into()),
            text: Some(text.into()),
            posted_at_millis: Some(1),
            ..Default::default()
        })
    }

    #[test]
    fn subscribe_activates_and_unsubscribe_deactivates() {
        let source = Arc::new(FakeSource::default());
        let manager = manager(&source);
        assert_eq!(manager.state(), SubscriptionState::Idle);

        manager.subscribe(Arc::new(Collector::default()));
        assert_eq!(manager.state(), SubscriptionState::Active);
        assert!(manager.is_listening());

        manager.unsubscribe().unwrap();
        assert_eq!(manager.state(), SubscriptionState::Idle);
        assert!(!manager.is_listening());
        assert_eq!(
            source.calls(),
            vec![
                ("register", SourceKind::Sms),
                ("register", SourceKind::Notification),
                ("unregister", SourceKind::Sms),
                ("unregister", SourceKind::Notification),
            ]
        );
    }

    #[test]
    fn resubscribe_replaces_without_reregistering() {
        let source = Arc::new(FakeSource::default());
        let manager = manager(&source);
        let first = Arc::new(Collector::default());
        let second = Arc::new(Collector::default());

        manager.subscribe(first.clone());
        manager.subscribe(second.clone());
        assert_eq!(manager.handle_raw_event(&kakao("hi")), 1);

        assert!(first.bodies().is_empty());
        assert_eq!(second.bodies(), ["hi"]);
        assert_eq!(source.calls().len(), 2);
    }

    #[test]
    fn raw_events_while_idle_are_dropped() {
        let source = Arc::new(FakeSource::default());
        let manager = manager(&source);
        assert_eq!(manager.handle_raw_event(&kakao("early")), 0);

        let collector = Arc::new(Collector::default());
        manager.subscribe(collector.clone());
        manager.handle_raw_event(&kakao("late"));
        assert_eq!(collector.bodies(), ["late"]);
    }

    #[test]
    fn unsubscribe_twice_is_harmless() {
        let source = Arc::new(FakeSource::default());
        let manager = manager(&source);
        manager.subscribe(Arc::new(Collector::default()));

        manager.unsubscribe().unwrap();
        manager.unsubscribe().unwrap();
        assert_eq!(manager.state(), SubscriptionState::Idle);
    }

    #[test]
    fn deregistration_error_is_reported_but_state_cleared() {
        let source = Arc::new(FakeSource::default());
        let manager = manager(&source);
        manager.subscribe(Arc::new(Collector::default()));
        *source.fail_unregister.lock().unwrap() = true;

        let err = manager.unsubscribe().unwrap_err();
        assert_eq!(err.kind, SourceKind::Sms);
        assert_eq!(manager.state(), SubscriptionState::Idle);
        assert!(!manager.is_listening());
        // Both listeners were still asked to deregister.
        assert_eq!(source.calls().len(), 4);
    }

    #[test]
    fn failed_activation_leaves_other_listeners_running() {
        let source = Arc::new(FakeSource::default());
        *source.fail_register.lock().unwrap() = Some(SourceKind::Notification);
        let manager = manager(&source);
        let collector = Arc::new(Collector::default());
        manager.subscribe(collector.clone());

        assert!(manager.is_listening());
        assert_eq!(manager.handle_raw_event(&kakao("lost")), 0);

        // Retried on the next subscribe.
        *source.fail_register.lock().unwrap() = None;
        manager.subscribe(collector.clone());
        assert_eq!(manager.handle_raw_event(&kakao("found")), 1);
        assert_eq!(collector.bodies(), ["found"]);
    }

    #[test]
    fn drop_deregisters_listeners() {
        let source = Arc::new(FakeSource::default());
        {
            let manager = manager(&source);
            manager.subscribe(Arc::new(Collector::default()));
        }
        let calls = source.calls();
        assert_eq!(calls.iter().filter(|(call, _)| *call == "unregister").count(), 2);
    }

    #[test]
    fn empty_sms_bundle_delivers_nothing() {
        let source = Arc::new(FakeSource::default());
        let manager = manager(&source);
        manager.subscribe(Arc::new(Collector::default()));
        assert_eq!(manager.handle_raw_event(&RawEvent::Sms(RawSmsBundle::default())), 0);
    }
}
