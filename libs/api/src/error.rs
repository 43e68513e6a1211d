use std::time::Duration;

/// Failure of a store operation. Whatever the variant, a failed write left
/// no rows behind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connection could not be opened or the database is locked/busy.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("store: {0}")]
    Backend(String),
}

/// Failure on a single listener channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,

    /// Malformed inbound frame. Not terminal: the frame is skipped.
    #[error("decode: {0}")]
    Decode(String),

    #[error("io: {0}")]
    Io(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ChannelError {
    /// Whether the channel must be dropped after this error.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ChannelError::Decode(_))
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(e: serde_json::Error) -> Self {
        ChannelError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_decode_errors_are_recoverable() {
        assert!(!ChannelError::Decode("bad".into()).is_terminal());
        assert!(ChannelError::Closed.is_terminal());
        assert!(ChannelError::Io("reset".into()).is_terminal());
        assert!(ChannelError::Timeout(Duration::from_secs(1)).is_terminal());
    }
}
