//! SQLite-backed message storage.
//!
//! This crate stands in for the host's message store: the table of sent and
//! received short messages that the platform keeps on its own. The runtime
//! only reads from it to answer history queries; the bundled CLI host also
//! writes to it the way the platform would when a message is sent or
//! received.
//!
//! # Example
//!
//! ```no_run
//! use storage::{MessageStore, NewMessage};
//!
//! let store = MessageStore::open("messages.db")?;
//! store.insert(&NewMessage::received("+821012345678", "hello", 1_700_000_000_000))?;
//!
//! for message in store.query(Some("+821012345678"), 10)? {
//!     println!("{}: {}", message.date, message.body);
//! }
//! # Ok::<(), storage::Error>(())
//! ```

mod error;
mod message;
mod store;

pub use error::{Error, Result};
pub use message::{NewMessage, StoredMessage, TYPE_INBOX, TYPE_SENT};
pub use store::MessageStore;
