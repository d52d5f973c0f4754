//! Sendbox runtime: event capture, relay, and message sending.
//!
//! This crate holds the platform-independent core. Everything that touches
//! the OS goes through the traits in [`host`], so the same pipeline runs on
//! a device, behind the CLI bridge, or against test fakes.
//!
//! # Overview
//!
//! - **Listeners** register with the OS and normalize raw payloads (SMS PDU
//!   bundles, posted notifications) into [`CapturedEvent`]s.
//! - **EventRelay** hands each event to the single current [`Subscriber`].
//! - **SubscriptionManager** keeps listeners registered exactly while a
//!   subscriber is attached.
//! - **MultipartSender** splits outbound messages and tracks per-part
//!   acknowledgments.
//! - **CommandDispatcher** exposes all of the above as named commands.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use runtime::{CommandDispatcher, EventRelay, GsmPduDecoder, MultipartSender,
//!     NotificationListener, SmsListener, SourceListener, SubscriptionManager};
//! use policy::Policy;
//!
//! let policy = Arc::new(Policy::default());
//! let listeners: Vec<Arc<dyn SourceListener>> = vec![
//!     Arc::new(SmsListener::new(host.clone(), Arc::new(GsmPduDecoder), policy.clone())),
//!     Arc::new(NotificationListener::new(host.clone(), policy)),
//! ];
//! let subscriptions = Arc::new(SubscriptionManager::new(Arc::new(EventRelay::new()), listeners));
//! let dispatcher = CommandDispatcher::new(
//!     subscriptions,
//!     Arc::new(MultipartSender::new(host.clone())),
//!     store,
//!     host,
//!     subscriber,
//! );
//! dispatcher.start_listening()?;
//! ```

mod dispatcher;
mod error;
mod event;
mod history;
pub mod host;
mod listener;
pub mod pdu;
mod relay;
mod sender;
mod subscription;

pub use dispatcher::CommandDispatcher;
pub use error::{Error, Result};
pub use event::{CapturedEvent, Pdu, RawEvent, RawNotification, RawSmsBundle};
pub use history::{DEFAULT_HISTORY_LIMIT, Direction, HistoryQuery, HistoryRecord, read_history};
pub use host::{EventSource, HistorySource, HostError, MessageTransport, StoreError, TransportError};
pub use listener::{NotificationListener, SmsListener, SourceListener};
pub use pdu::{DecodeError, DecodedPdu, GsmPduDecoder, PduDecoder, gsm_septet_count};
pub use relay::{EventRelay, Subscriber};
pub use sender::{
    AckHandle, AckKind, AckOutcome, AckPair, MessagePart, MultipartSender, OutboundMessage,
    SendReceipt,
};
pub use subscription::{SubscriptionManager, SubscriptionState};
