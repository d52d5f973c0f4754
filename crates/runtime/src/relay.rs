//! Single-subscriber event relay.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use crate::event::CapturedEvent;

/// Receives captured events.
///
/// Called synchronously on whatever thread published the event.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: CapturedEvent);
}

/// Lets an async task drain the stream.
impl Subscriber for mpsc::UnboundedSender<CapturedEvent> {
    fn on_event(&self, event: CapturedEvent) {
        if self.send(event).is_err() {
            debug!("subscriber channel closed, event dropped");
        }
    }
}

/// Delivers events to at most one subscriber.
///
/// There is no buffering: events published while nobody is attached are gone.
#[derive(Default)]
pub struct EventRelay {
    slot: Mutex<Option<Arc<dyn Subscriber>>>,
}

impl EventRelay {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Option<Arc<dyn Subscriber>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Attach a subscriber, returning the one it replaced.
    pub fn attach(&self, subscriber: Arc<dyn Subscriber>) -> Option<Arc<dyn Subscriber>> {
        self.slot().replace(subscriber)
    }

    /// Detach the current subscriber, if any.
    pub fn detach(&self) -> Option<Arc<dyn Subscriber>> {
        self.slot().take()
    }

    pub fn is_attached(&self) -> bool {
        self.slot().is_some()
    }

    /// Deliver an event to the current subscriber. Returns whether it was delivered.
    ///
    /// The subscriber is called after the slot lock is released, so it may
    /// attach or detach from inside `on_event`. The flip side is that a
    /// publish racing [`detach`](Self::detach) or [`attach`](Self::attach)
    /// can still reach the subscriber that was just replaced.
    pub fn publish(&self, event: CapturedEvent) -> bool {
        let subscriber = self.slot().clone();
        match subscriber {
            Some(subscriber) => {
                subscriber.on_event(event);
                true
            }
            None => {
                debug!(source = %event.source_kind(), "no subscriber, event dropped");
                false
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Collects every event it receives.
    #[derive(Default)]
    pub struct Collector {
        pub events: Mutex<Vec<CapturedEvent>>,
    }

    impl Collector {
        pub fn bodies(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|e| e.body().to_string())
                .collect()
        }
    }

    impl Subscriber for Collector {
        fn on_event(&self, event: CapturedEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::Collector;
    use super::*;

    fn sms(body: &str) -> CapturedEvent {
        CapturedEvent::sms("1588", body, 0)
    }

    #[test]
    fn publish_without_subscriber_is_a_noop() {
        let relay = EventRelay::new();
        assert!(!relay.publish(sms("lost")));
        assert!(!relay.is_attached());
    }

    #[test]
    fn late_subscriber_never_sees_earlier_events() {
        let relay = EventRelay::new();
        relay.publish(sms("before"));

        let collector = Arc::new(Collector::default());
        relay.attach(collector.clone());
        relay.publish(sms("after"));

        assert_eq!(collector.bodies(), ["after"]);
    }

    #[test]
    fn attach_replaces_instead_of_adding() {
        let relay = EventRelay::new();
        let first = Arc::new(Collector::default());
        let second = Arc::new(Collector::default());

        assert!(relay.attach(first.clone()).is_none());
        assert!(relay.attach(second.clone()).is_some());
        relay.publish(sms("one"));

        assert!(first.bodies().is_empty());
        assert_eq!(second.bodies(), ["one"]);
    }

    #[test]
    fn events_arrive_in_publish_order() {
        let relay = EventRelay::new();
        let collector = Arc::new(Collector::default());
        relay.attach(collector.clone());
        for body in ["a", "b", "c"] {
            relay.publish(sms(body));
        }
        assert_eq!(collector.bodies(), ["a", "b", "c"]);
    }

    #[test]
    fn detach_stops_delivery() {
        let relay = EventRelay::new();
        let collector = Arc::new(Collector::default());
        relay.attach(collector.clone());
        assert!(relay.detach().is_some());
        assert!(!relay.publish(sms("gone")));
        assert!(collector.bodies().is_empty());
    }

    struct DetachOnFirst {
        relay: Arc<EventRelay>,
        seen: Collector,
    }

    impl Subscriber for DetachOnFirst {
        fn on_event(&self, event: CapturedEvent) {
            self.seen.on_event(event);
            self.relay.detach();
        }
    }

    #[test]
    fn subscriber_can_detach_while_handling_an_event() {
        let relay = Arc::new(EventRelay::new());
        let subscriber = Arc::new(DetachOnFirst {
            relay: relay.clone(),
            seen: Collector::default(),
        });
        relay.attach(subscriber.clone());

        assert!(relay.publish(sms("one")));
        assert!(!relay.publish(sms("two")));
        assert_eq!(subscriber.seen.bodies(), ["one"]);
    }

    #[tokio::test]
    async fn channel_subscriber_receives_events() {
        let relay = EventRelay::new();
        let (tx, mut rx) = mpsc::unbounded_channel::<CapturedEvent>();
        relay.attach(Arc::new(tx));
        relay.publish(sms("hello"));
        let event = rx.recv().await.unwrap();
        assert_eq!(event.body(), "hello");
    }

    #[test]
    fn concurrent_publishers_all_deliver() {
        let relay = Arc::new(EventRelay::new());
        let collector = Arc::new(Collector::default());
        relay.attach(collector.clone());

        let publishers: Vec<_> = (0..4)
            .map(|_| {
                let relay = relay.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        relay.publish(sms(&i.to_string()));
                    }
                })
            })
            .collect();
        for handle in publishers {
            handle.join().unwrap();
        }

        assert_eq!(collector.events.lock().unwrap().len(), 400);
    }
}
