/// Errors that can occur in channel operations.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// `init` called on an initialized manager.
    #[error("channel already initialized")]
    AlreadyInitialized,

    /// Operation requires `init` first.
    #[error("channel not initialized")]
    NotInitialized,

    /// `start` called while the workers are running.
    #[error("channel already running")]
    AlreadyRunning,

    /// `deinit` called before `stop`.
    #[error("channel still running; stop it first")]
    StillRunning,

    /// `stop` called while the workers are not running.
    #[error("channel not running")]
    NotRunning,

    /// A bounded queue rejected a message.
    #[error("queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),

    /// A worker thread panicked.
    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] pacerlink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] pacerlink_frame::FrameError),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
