use std::future::Future;
use std::pin::Pin;

use crate::error::ChannelError;
use crate::phone::Phone;

pub type ChannelFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChannelError>> + Send + 'a>>;

// ════════════════════════════════════════════════════════════════
//  Listener channel transport
// ════════════════════════════════════════════════════════════════
//
// A bidirectional listener connection, split into its two halves so the
// inbound read loop and the outbound writer can run as separate tasks.
// "Accept" belongs to the transport (e.g. the WebSocket upgrade); the hub
// only ever sees an already established channel.

/// Inbound half of a listener channel.
pub trait ChannelReader: Send {
    /// Next inbound event. `Ok(None)` means the peer closed the channel.
    ///
    /// `Err(ChannelError::Decode)` reports a malformed frame and leaves the
    /// channel usable; every other error is terminal.
    fn read_event(&mut self) -> ChannelFuture<'_, Option<Phone>>;
}

/// Outbound half of a listener channel.
pub trait ChannelWriter: Send {
    /// Write one event. Any error is terminal for the channel.
    fn write_event<'a>(&'a mut self, phone: &'a Phone) -> ChannelFuture<'a, ()>;

    /// Release the underlying connection. Best effort, never fails.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
