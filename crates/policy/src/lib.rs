//! Source filtering policy.
//!
//! Decides which originating packages and senders are allowed to produce
//! captured events. Anything not accepted here is dropped before it reaches
//! a subscriber.

mod error;
mod policy;
mod source;

pub use error::{Error, Result};
pub use policy::{AllowRules, DEFAULT_PACKAGES, Decision, DenyRules, Policy};
pub use source::{SourceKind, SourceRequest};
