//! `sendbox serve`: the command surface over JSON lines on stdio.
//!
//! Each stdin line is either a method call or a raw OS event wrapped as
//! `{"raw": {...}}`. Replies and captured events go to stdout, one frame
//! per line. Raw events never get a reply, even when they are malformed.

use std::sync::Arc;

use protocol::{
    ErrorCode, MethodCall, MethodResponse, Outbound, RequestId, decode_line, encode_line,
};
use runtime::{
    CapturedEvent, CommandDispatcher, EventRelay, GsmPduDecoder, MultipartSender,
    NotificationListener, RawEvent, SmsListener, SourceListener, Subscriber, SubscriptionManager,
};
use serde_json::Value;
use storage::MessageStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bridge::{BridgeHost, settle_acks};
use crate::config::Config;
use crate::error::{Error, Result};

/// The wired-up pipeline behind one bridge session.
pub struct Bridge {
    host: Arc<BridgeHost>,
    subscriptions: Arc<SubscriptionManager>,
    sender: Arc<MultipartSender>,
    dispatcher: CommandDispatcher,
    decoder: GsmPduDecoder,
}

impl Bridge {
    pub fn new(config: &Config, store: Arc<MessageStore>, subscriber: Arc<dyn Subscriber>) -> Self {
        let host = Arc::new(BridgeHost::new(store.clone()));
        let policy = Arc::new(config.policy.clone());

        let listeners: Vec<Arc<dyn SourceListener>> = vec![
            Arc::new(SmsListener::new(
                host.clone(),
                Arc::new(GsmPduDecoder),
                policy.clone(),
            )),
            Arc::new(NotificationListener::new(host.clone(), policy)),
        ];
        let subscriptions = Arc::new(SubscriptionManager::new(
            Arc::new(EventRelay::new()),
            listeners,
        ));
        let sender = Arc::new(MultipartSender::new(host.clone()));
        let dispatcher = CommandDispatcher::new(
            subscriptions.clone(),
            sender.clone(),
            store,
            host.clone(),
            subscriber,
        )
        .with_default_limit(config.history.default_limit);

        Self {
            host,
            subscriptions,
            sender,
            dispatcher,
            decoder: GsmPduDecoder,
        }
    }

    /// Handle one input line, returning the reply to write, if any.
    pub fn handle_line(&self, line: &str) -> Option<Outbound> {
        if line.trim().is_empty() {
            return None;
        }

        let mut frame = match decode_line::<Value>(line) {
            Ok(frame) => frame,
            Err(e) => return Some(rejected(None, e.to_string())),
        };

        if let Some(raw) = frame.as_object_mut().and_then(|o| o.remove("raw")) {
            match serde_json::from_value::<RawEvent>(raw) {
                Ok(raw) => self.handle_raw(&raw),
                Err(e) => warn!(error = %e, "dropping malformed raw event"),
            }
            return None;
        }

        let id = frame
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value::<RequestId>(id).ok());
        match serde_json::from_value::<MethodCall>(frame) {
            Ok(call) => {
                let response = self.dispatcher.dispatch(&call);
                settle_acks(&self.host, &self.sender);
                Some(Outbound::Reply {
                    id: call.id,
                    response,
                })
            }
            Err(e) => Some(rejected(id, format!("malformed call: {e}"))),
        }
    }

    /// Handle one line of raw input, which may not be UTF-8.
    pub fn handle_bytes(&self, line: &[u8]) -> Option<Outbound> {
        match std::str::from_utf8(line) {
            Ok(line) => self.handle_line(line),
            Err(e) => {
                warn!(error = %e, "rejecting line that is not UTF-8");
                Some(rejected(None, format!("frame is not valid UTF-8: {e}")))
            }
        }
    }

    fn handle_raw(&self, raw: &RawEvent) {
        if let RawEvent::Sms(bundle) = raw {
            self.host.record_inbound(bundle, &self.decoder);
        }
        let delivered = self.subscriptions.handle_raw_event(raw);
        debug!(source = %raw.kind(), delivered, "raw event handled");
    }
}

fn rejected(id: Option<RequestId>, message: String) -> Outbound {
    Outbound::Reply {
        id,
        response: MethodResponse::error(ErrorCode::InvalidArgument, message),
    }
}

/// Run the bridge until stdin closes.
pub async fn serve(config: &Config, store: Arc<MessageStore>) -> Result<()> {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Outbound>();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<CapturedEvent>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(frame) = out_rx.recv().await {
            let line = encode_line(&frame)?;
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<(), Error>(())
    });

    let events_out = out_tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let frame = Outbound::Event {
                event: event.to_frame(),
            };
            if events_out.send(frame).is_err() {
                break;
            }
        }
    });

    let bridge = Bridge::new(config, store, Arc::new(event_tx));
    info!("bridge ready");

    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut line = Vec::new();
    loop {
        line.clear();
        if stdin.read_until(b'\n', &mut line).await? == 0 {
            break;
        }
        if let Some(reply) = bridge.handle_bytes(&line) {
            if out_tx.send(reply).is_err() {
                break;
            }
        }
    }

    info!("stdin closed, shutting down");
    // Deregisters listeners and releases the last subscriber handle.
    drop(bridge);
    forwarder.await.map_err(std::io::Error::from)?;
    drop(out_tx);
    writer.await.map_err(std::io::Error::from)??;
    Ok(())
}
