//! Wire types of the sendbox command surface and event stream.
//!
//! Callers send a [`MethodCall`] naming one of the fixed commands and get a
//! [`MethodResponse`] back. Captured events travel the other way as
//! [`EventFrame`]s. The [`codec`] module frames both as JSON lines for the
//! stdio bridge.
//!
//! # Example
//!
//! ```
//! use protocol::{MethodCall, MethodResponse, ErrorCode};
//! use serde_json::json;
//!
//! let call = MethodCall::new("sendMessage")
//!     .with_id(1_i64)
//!     .with_arguments(json!({"destination": "", "body": "hi"}));
//! assert_eq!(call.str_arg("body"), Some("hi"));
//!
//! let response = MethodResponse::error(ErrorCode::InvalidArgument, "destination is empty");
//! assert_eq!(response.error_code(), Some(ErrorCode::InvalidArgument));
//! ```

pub mod codec;
mod error;
mod event;
mod method;

pub use codec::{MAX_FRAME_SIZE, Outbound, decode_line, encode_line};
pub use error::{Error, Result};
pub use event::EventFrame;
pub use method::{ErrorCode, MethodCall, MethodError, MethodResponse, RequestId};
