//! Named command handling.

use std::sync::Arc;

use protocol::{MethodCall, MethodResponse};
use serde_json::Value;
use tracing::debug;

use crate::history::{DEFAULT_HISTORY_LIMIT, HistoryQuery, HistoryRecord, read_history};
use crate::host::{EventSource, HistorySource};
use crate::relay::Subscriber;
use crate::sender::{MultipartSender, OutboundMessage};
use crate::subscription::SubscriptionManager;
use crate::{Error, Result};

/// Runs the fixed command set against the capture and send pipeline.
pub struct CommandDispatcher {
    subscriptions: Arc<SubscriptionManager>,
    sender: Arc<MultipartSender>,
    history: Arc<dyn HistorySource>,
    host: Arc<dyn EventSource>,
    default_subscriber: Arc<dyn Subscriber>,
    default_limit: usize,
}

impl CommandDispatcher {
    /// `default_subscriber` receives events when listening is started by
    /// command rather than by an explicit subscription.
    pub fn new(
        subscriptions: Arc<SubscriptionManager>,
        sender: Arc<MultipartSender>,
        history: Arc<dyn HistorySource>,
        host: Arc<dyn EventSource>,
        default_subscriber: Arc<dyn Subscriber>,
    ) -> Self {
        Self {
            subscriptions,
            sender,
            history,
            host,
            default_subscriber,
            default_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Limit applied to history queries that do not pass one.
    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit;
        self
    }

    /// Send a message, split into parts if needed.
    pub fn send_message(&self, destination: &str, body: &str) -> Result<bool> {
        if destination.is_empty() || body.is_empty() {
            return Err(Error::InvalidArgument(
                "destination and body cannot be empty".into(),
            ));
        }
        self.sender.send(&OutboundMessage::new(destination, body))?;
        Ok(true)
    }

    /// Start capturing. A no-op while listeners are already registered.
    pub fn start_listening(&self) -> Result<()> {
        if self.subscriptions.is_listening() {
            debug!("already listening");
            return Ok(());
        }
        self.subscriptions.subscribe(self.default_subscriber.clone());
        Ok(())
    }

    /// Stop capturing. The manager is idle afterwards even when this fails.
    pub fn stop_listening(&self) -> Result<()> {
        self.subscriptions
            .unsubscribe()
            .map_err(|e| Error::OperationFailed(format!("failed to stop listening: {e}")))
    }

    pub fn query_history(&self, query: &HistoryQuery) -> Result<Vec<HistoryRecord>> {
        read_history(self.history.as_ref(), query)
    }

    pub fn has_notification_access(&self) -> bool {
        self.host.has_notification_access()
    }

    /// Handle a call by name. Never panics on unknown or malformed calls.
    pub fn dispatch(&self, call: &MethodCall) -> MethodResponse {
        match self.run(call) {
            Ok(result) => MethodResponse::success(result),
            Err(Error::NotImplemented(method)) => {
                debug!(%method, "unknown method");
                MethodResponse::not_implemented(method)
            }
            Err(e) => MethodResponse::error(e.code(), e.to_string()),
        }
    }

    fn run(&self, call: &MethodCall) -> Result<Value> {
        match call.method.as_str() {
            "sendMessage" | "sendSms" => {
                let destination = call
                    .str_arg("destination")
                    .or_else(|| call.str_arg("phoneNumber"))
                    .unwrap_or_default();
                let body = call
                    .str_arg("body")
                    .or_else(|| call.str_arg("message"))
                    .unwrap_or_default();
                self.send_message(destination, body).map(Value::Bool)
            }
            "startListening" => self.start_listening().map(|()| Value::Null),
            "stopListening" => self.stop_listening().map(|()| Value::Null),
            "queryHistory" | "getSmsMessages" => {
                let query = self.history_query(call)?;
                let records = self.query_history(&query)?;
                serde_json::to_value(records).map_err(|e| Error::ReadFailed(e.to_string()))
            }
            "hasNotificationListenerPermission" => Ok(Value::Bool(self.has_notification_access())),
            other => Err(Error::NotImplemented(other.to_string())),
        }
    }

    fn history_query(&self, call: &MethodCall) -> Result<HistoryQuery> {
        let origin_id = call
            .str_arg("originId")
            .or_else(|| call.str_arg("phoneNumber"))
            .filter(|o| !o.is_empty())
            .map(str::to_string);

        let limit = match call.arguments.get("limit") {
            None | Some(Value::Null) => self.default_limit,
            Some(value) => value
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| {
                    Error::InvalidArgument(format!(
                        "limit must be a non-negative integer, got {value}"
                    ))
                })?,
        };

        Ok(HistoryQuery::new(origin_id, limit))
    }
}
