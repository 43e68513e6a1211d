//! Shared record types and the collaborator traits the phonebook core is
//! written against: the record store and the listener channel transport.

pub mod channel;
pub mod error;
pub mod phone;
pub mod store;

use serde::{Deserialize, Serialize};

pub use channel::{ChannelFuture, ChannelReader, ChannelWriter};
pub use error::{ChannelError, StoreError};
pub use phone::{NewPhone, Phone, PhoneId};
pub use store::{PhoneStore, StoreFuture};

// ════════════════════════════════════════════════════════════════
//  Overflow Policy
// ════════════════════════════════════════════════════════════════

/// What to do when a bounded per-listener queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// try_send(): the queue is full, skip this event for that listener and log it.
    #[default]
    Drop,
    /// The queue is full, treat the listener as dead and unregister it.
    Disconnect,
}

impl std::fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverflowPolicy::Drop => f.write_str("drop"),
            OverflowPolicy::Disconnect => f.write_str("disconnect"),
        }
    }
}
