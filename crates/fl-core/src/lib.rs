pub mod config;
pub mod error;
pub mod types;

pub use config::{
    CaptureConfig, OverflowPolicy, PlayerConfig, QueueConfig, SourceEntry, SourceMatch,
    TransportConfig, TransportKind,
};
pub use error::{CoreError, Result};
pub use types::{
    FourCC, FrameDescriptor, FrameRate, MetadataSample, NetworkSource, OutputPixelFormat,
    SampleFormat, VideoSample,
};

// Re-export for convenience
pub use bytes::Bytes;
