//! Broadcast hub: fans record events out to every connected listener.

pub mod config;
pub mod error;
mod hub;
mod listener;

pub use config::HubConfig;
pub use error::HubError;
pub use hub::{Hub, HubEvent};
pub use listener::{ListenerHandle, ListenerId};
