use std::sync::Arc;
use std::time::Duration;

use fl_core::{FrameDescriptor, NetworkSource, TransportConfig, TransportKind};
use thiserror::Error;

pub mod loopback;
pub mod packet;
pub mod protocol;
pub mod udp;

pub use loopback::LoopbackNetwork;
pub use packet::Packet;
pub use protocol::FrameHeader;
pub use udp::{StaticSourceFinder, UdpTransport};

pub type Result<T> = std::result::Result<T, TransportError>;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to create handle: {0}")]
    CreateFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bandwidth {
    #[default]
    Highest,
    Lowest,
}

/// Pixel formats a receiver prefers to be handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorFormat {
    #[default]
    Best,
    BgrxBgra,
    UyvyBgra,
}

#[derive(Debug, Clone)]
pub struct ReceiverSettings {
    pub bandwidth: Bandwidth,
    pub allow_video_fields: bool,
    pub color_format: ColorFormat,
    /// Frames buffered inside the receive handle before the oldest is discarded.
    pub queue_depth: usize,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            bandwidth: Bandwidth::Highest,
            allow_video_fields: false,
            color_format: ColorFormat::Best,
            queue_depth: 4,
        }
    }
}

/// Send half of a transport session. Dropping it destroys the handle.
pub trait VideoSender: Send {
    fn name(&self) -> &str;

    /// Blocks until the transport has accepted the frame.
    fn send(&mut self, frame: &FrameDescriptor) -> Result<()>;
}

/// Receive half of a transport session. Dropping it destroys the handle.
pub trait VideoReceiver: Send {
    fn connect(&mut self, source: &NetworkSource) -> Result<()>;

    /// Waits at most `timeout` for a frame. The returned frame is owned by
    /// the caller and released when dropped.
    fn poll_frame(&mut self, timeout: Duration) -> Result<Option<FrameDescriptor>>;
}

/// Lists the sources currently visible on the network.
pub trait SourceFinder: Send + Sync {
    fn current_sources(&self) -> Vec<NetworkSource>;
}

/// Creates send and receive handles.
pub trait Transport: Send + Sync {
    fn create_sender(&self, name: &str) -> Result<Box<dyn VideoSender>>;
    fn create_receiver(&self, settings: &ReceiverSettings) -> Result<Box<dyn VideoReceiver>>;
}

/// Factory to create the configured transport and its source finder
pub struct TransportFactory;

impl TransportFactory {
    pub fn create(config: &TransportConfig) -> Result<(Arc<dyn Transport>, Arc<dyn SourceFinder>)> {
        match config.kind {
            TransportKind::Loopback => {
                tracing::info!("Creating loopback transport");
                let network = Arc::new(LoopbackNetwork::new(config.host_name.clone()));
                let transport: Arc<dyn Transport> = network.clone();
                let finder: Arc<dyn SourceFinder> = network;
                Ok((transport, finder))
            }
            TransportKind::Udp => {
                tracing::info!("Creating UDP transport");
                let transport: Arc<dyn Transport> = Arc::new(UdpTransport::from_config(config)?);
                let finder: Arc<dyn SourceFinder> = Arc::new(StaticSourceFinder::from_config(config));
                Ok((transport, finder))
            }
        }
    }
}
