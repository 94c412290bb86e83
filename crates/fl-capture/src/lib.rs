//! Capture side of a link: readbacks are converted on the render thread,
//! queued, and pushed to the transport by a dedicated send worker.

use thiserror::Error;

pub mod queue;
pub mod session;
pub mod stats;
pub mod worker;

pub use queue::{FrameQueue, PushOutcome};
pub use session::{CaptureBaseData, CaptureSession, CaptureState, FrameProducer};
pub use stats::{CaptureCounters, CaptureStats};
pub use worker::SendWorker;

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Capture is already running")]
    AlreadyRunning,

    #[error("Capture is not running")]
    NotCapturing,

    #[error("Failed to spawn send worker: {0}")]
    Worker(std::io::Error),

    #[error(transparent)]
    Config(#[from] fl_core::CoreError),

    #[error(transparent)]
    Convert(#[from] fl_convert::ConvertError),

    #[error(transparent)]
    Transport(#[from] fl_transport::TransportError),
}
