#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub config: {0}")]
    Config(String),

    #[error("fan-out loop is already running")]
    FanOutRunning,

    #[error("event queue is full")]
    QueueFull,

    #[error("hub is shut down")]
    Closed,
}
