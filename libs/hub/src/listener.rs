use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use phonebook_api::{ChannelError, ChannelReader, ChannelWriter, Phone};

use crate::hub::Hub;

pub type ListenerId = u64;

// ═══════════════════════════════════════════════════════════════
//  Registry entry
// ═══════════════════════════════════════════════════════════════

/// Hub-side state of one registered listener.
///
/// Dropping the entry drops `tx`, which ends the writer task and releases
/// the channel.
pub(crate) struct Listener {
    pub(crate) tx: mpsc::Sender<Phone>,
    pub(crate) closed: CancellationToken,
}

// ═══════════════════════════════════════════════════════════════
//  ListenerHandle
// ═══════════════════════════════════════════════════════════════

/// Returned by [`Hub::register`]; consumed by [`Hub::read_loop`].
pub struct ListenerHandle {
    pub(crate) id: ListenerId,
    pub(crate) reader: Box<dyn ChannelReader>,
    pub(crate) closed: CancellationToken,
}

impl ListenerHandle {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Whether the hub has already unregistered this listener.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("id", &self.id)
            .field("closed", &self.closed.is_cancelled())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Writer task
// ═══════════════════════════════════════════════════════════════

/// Drains one listener's outbound queue into its channel.
///
/// A failed or timed-out write unregisters the listener. The channel is
/// closed on every exit path.
pub(crate) async fn write_loop(
    hub: Arc<Hub>,
    id: ListenerId,
    mut writer: Box<dyn ChannelWriter>,
    mut rx: mpsc::Receiver<Phone>,
    closed: CancellationToken,
    write_timeout: Duration,
) {
    loop {
        let phone = tokio::select! {
            biased;
            _ = closed.cancelled() => None,
            next = rx.recv() => next,
        };
        let Some(phone) = phone else { break };

        let result = tokio::select! {
            biased;
            _ = closed.cancelled() => break,
            r = tokio::time::timeout(write_timeout, writer.write_event(&phone)) => {
                r.unwrap_or(Err(ChannelError::Timeout(write_timeout)))
            }
        };
        if let Err(e) = result {
            tracing::warn!(listener = id, error = %e, "write failed, dropping listener");
            hub.unregister(id, "write error").await;
            break;
        }
    }

    writer.close().await;
    tracing::debug!(listener = id, "writer closed");
}

/// One read with an optional idle deadline.
pub(crate) async fn read_event(
    reader: &mut dyn ChannelReader,
    deadline: Option<Duration>,
) -> Result<Option<Phone>, ChannelError> {
    match deadline {
        Some(d) => tokio::time::timeout(d, reader.read_event())
            .await
            .unwrap_or(Err(ChannelError::Timeout(d))),
        None => reader.read_event().await,
    }
}
