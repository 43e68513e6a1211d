use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use phonebook_api::{ChannelReader, ChannelWriter, OverflowPolicy, Phone};

use crate::config::HubConfig;
use crate::error::HubError;
use crate::listener::{self, Listener, ListenerHandle, ListenerId};

/// One record travelling through the fan-out queue.
#[derive(Debug, Clone)]
pub struct HubEvent {
    /// Listener the event was read from; `None` for server-side updates.
    pub origin: Option<ListenerId>,
    pub phone: Phone,
}

// ═══════════════════════════════════════════════════════════════
//  Hub
// ═══════════════════════════════════════════════════════════════

/// Registry of connected listeners plus the shared FIFO fan-out queue.
///
/// Every mutation of the listener set goes through the single `RwLock`:
/// `register`, the read loop on exit, the writer task on a failed write and
/// the fan-out loop on overflow.
pub struct Hub {
    config: HubConfig,
    listeners: RwLock<HashMap<ListenerId, Listener>>,
    events_tx: mpsc::Sender<HubEvent>,
    /// Taken by the running fan-out loop, handed back when it stops.
    events_rx: Mutex<Option<mpsc::Receiver<HubEvent>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for Hub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hub").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Hub {
    pub fn new(config: HubConfig) -> Result<Arc<Self>, HubError> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::channel(config.queue_capacity);
        Ok(Arc::new(Self {
            config,
            listeners: RwLock::new(HashMap::new()),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            next_id: AtomicU64::new(1),
        }))
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub async fn listener_count(&self) -> usize {
        self.listeners.read().await.len()
    }

    /// Add an accepted channel to the listener set and start its writer.
    pub async fn register(
        self: &Arc<Self>,
        reader: Box<dyn ChannelReader>,
        writer: Box<dyn ChannelWriter>,
    ) -> ListenerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.listener_buffer);
        let closed = CancellationToken::new();

        self.listeners.write().await.insert(
            id,
            Listener {
                tx,
                closed: closed.clone(),
            },
        );

        tokio::spawn(listener::write_loop(
            self.clone(),
            id,
            writer,
            rx,
            closed.clone(),
            self.config.write_timeout(),
        ));

        tracing::info!(listener = id, "listener registered");
        ListenerHandle { id, reader, closed }
    }

    /// Pump one listener's inbound events into the fan-out queue until its
    /// channel fails, closes, or the hub drops it. Always unregisters the
    /// listener on the way out.
    pub async fn read_loop(&self, handle: ListenerHandle) {
        let ListenerHandle {
            id,
            mut reader,
            closed,
        } = handle;
        let read_timeout = self.config.read_timeout();

        let reason = loop {
            let next = tokio::select! {
                biased;
                _ = closed.cancelled() => None,
                r = listener::read_event(&mut *reader, read_timeout) => Some(r),
            };
            let Some(next) = next else { break "unregistered" };

            match next {
                Ok(Some(phone)) => {
                    let event = HubEvent {
                        origin: Some(id),
                        phone,
                    };
                    // A full queue must not pin the listener after removal.
                    tokio::select! {
                        biased;
                        _ = closed.cancelled() => break "unregistered",
                        r = self.events_tx.send(event) => {
                            if r.is_err() {
                                break "hub closed";
                            }
                        }
                    }
                }
                Ok(None) => break "closed by peer",
                Err(e) if !e.is_terminal() => {
                    tracing::warn!(listener = id, error = %e, "malformed event, skipping");
                }
                Err(e) => {
                    tracing::info!(listener = id, error = %e, "read failed");
                    break "read error";
                }
            }
        };

        self.unregister(id, reason).await;
    }

    /// Enqueue a server-side record update. Does not wait for queue space.
    pub fn publish(&self, phone: Phone) -> Result<(), HubError> {
        self.events_tx
            .try_send(HubEvent {
                origin: None,
                phone,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => HubError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => HubError::Closed,
            })
    }

    /// The fan-out worker: take events in FIFO order and hand each one to
    /// every registered listener. Only one may run at a time.
    pub async fn fan_out(&self, token: CancellationToken) -> Result<(), HubError> {
        let mut rx = self
            .events_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(HubError::FanOutRunning)?;
        tracing::info!("fan-out loop started");

        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                e = rx.recv() => e,
            };
            let Some(event) = event else { break };
            self.deliver(&event).await;
        }

        *self.events_rx.lock().unwrap_or_else(PoisonError::into_inner) = Some(rx);
        tracing::info!("fan-out loop stopped");
        Ok(())
    }

    pub fn spawn_fan_out(self: &Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            if let Err(e) = hub.fan_out(token).await {
                tracing::error!(error = %e, "fan-out loop failed to start");
            }
        })
    }

    /// Unregister every listener, closing their channels.
    pub async fn close_all(&self) {
        let drained: Vec<_> = self.listeners.write().await.drain().collect();
        for (id, listener) in drained {
            listener.closed.cancel();
            tracing::info!(listener = id, reason = "hub shutdown", "listener unregistered");
        }
    }

    /// Queue `event` on every listener's outbound queue. Returns how many
    /// listeners accepted it.
    async fn deliver(&self, event: &HubEvent) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();
        {
            let listeners = self.listeners.read().await;
            for (&id, listener) in listeners.iter() {
                if self.config.exclude_sender && event.origin == Some(id) {
                    continue;
                }
                match listener.tx.try_send(event.phone.clone()) {
                    Ok(()) => delivered += 1,
                    Err(mpsc::error::TrySendError::Full(_)) => match self.config.overflow {
                        OverflowPolicy::Drop => {
                            tracing::warn!(listener = id, "listener queue full, dropping event");
                        }
                        OverflowPolicy::Disconnect => dead.push((id, "queue overflow")),
                    },
                    Err(mpsc::error::TrySendError::Closed(_)) => dead.push((id, "writer gone")),
                }
            }
        }

        for (id, reason) in dead {
            self.unregister(id, reason).await;
        }
        delivered
    }

    /// Remove `id` from the listener set. Safe to call more than once.
    pub(crate) async fn unregister(&self, id: ListenerId, reason: &str) -> bool {
        let removed = self.listeners.write().await.remove(&id);
        match removed {
            Some(listener) => {
                listener.closed.cancel();
                tracing::info!(listener = id, reason, "listener unregistered");
                true
            }
            None => false,
        }
    }
}
