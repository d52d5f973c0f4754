//! Posted-notification listener.

use std::sync::Arc;

use chrono::Utc;
use policy::{Decision, Policy, SourceKind, SourceRequest};
use tracing::{debug, warn};

use super::{Registration, SourceListener};
use crate::event::{CapturedEvent, RawEvent};
use crate::host::{EventSource, HostError};

/// Captures notifications posted by allowed packages.
pub struct NotificationListener {
    registration: Registration,
    policy: Arc<Policy>,
}

impl NotificationListener {
    pub fn new(source: Arc<dyn EventSource>, policy: Arc<Policy>) -> Self {
        Self {
            registration: Registration::new(SourceKind::Notification, source),
            policy,
        }
    }
}

impl SourceListener for NotificationListener {
    fn kind(&self) -> SourceKind {
        SourceKind::Notification
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
        let RawEvent::Notification(notification) = raw else {
            warn!(kind = %raw.kind(), "notification listener received a foreign event");
            return Vec::new();
        };

        let Some(package) = notification.package_name.as_deref().filter(|p| !p.is_empty()) else {
            warn!("dropping notification without package name");
            return Vec::new();
        };

        if let Decision::Deny { reason } = self.policy.check(&SourceRequest::notification(package)) {
            debug!(package, %reason, "notification filtered");
            return Vec::new();
        }

        let title = notification.title.as_deref().unwrap_or_default();
        let expanded = notification.big_text.as_deref().unwrap_or_default();
        let body = if expanded.is_empty() {
            notification.text.as_deref().unwrap_or_default()
        } else {
            expanded
        };

        if title.is_empty() && body.is_empty() {
            debug!(package, "notification without content ignored");
            return Vec::new();
        }

        let timestamp_millis = notification
            .posted_at_millis
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        vec![CapturedEvent::notification(package, title, body, timestamp_millis)]
    }
}
