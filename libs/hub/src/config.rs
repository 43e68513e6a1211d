use std::time::Duration;

use serde::Deserialize;

use phonebook_api::OverflowPolicy;

use crate::error::HubError;

fn default_queue_capacity() -> usize {
    1024
}
fn default_listener_buffer() -> usize {
    256
}
fn default_write_timeout_ms() -> u64 {
    5000
}

/// `[hub]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Capacity of the shared fan-out queue. Producers wait when it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Outbound queue per listener.
    #[serde(default = "default_listener_buffer")]
    pub listener_buffer: usize,
    /// What happens when a listener's outbound queue is full.
    #[serde(default)]
    pub overflow: OverflowPolicy,
    /// Skip the listener an event came from.
    #[serde(default)]
    pub exclude_sender: bool,
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// Close listeners that stay silent this long. Unset = never.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            listener_buffer: default_listener_buffer(),
            overflow: OverflowPolicy::default(),
            exclude_sender: false,
            write_timeout_ms: default_write_timeout_ms(),
            read_timeout_ms: None,
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> Result<(), HubError> {
        if self.queue_capacity == 0 {
            return Err(HubError::Config("queue_capacity must be > 0".into()));
        }
        if self.listener_buffer == 0 {
            return Err(HubError::Config("listener_buffer must be > 0".into()));
        }
        if self.write_timeout_ms == 0 {
            return Err(HubError::Config("write_timeout_ms must be > 0".into()));
        }
        if self.read_timeout_ms == Some(0) {
            return Err(HubError::Config("read_timeout_ms must be > 0 when set".into()));
        }
        Ok(())
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }
}
