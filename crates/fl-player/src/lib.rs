//! Receive side of a link: resolves a source by URL, polls its frames once
//! per tick and hands decoded samples to a [`SampleSink`].

use thiserror::Error;

pub mod player;
pub mod sink;
pub mod source;

pub use player::{MediaPlayer, PlayerEvent, PlayerState, PlayerStats, TickReport};
pub use sink::{MediaSamples, SampleSink};
pub use source::{find_source, parse_url, source_name_of};

pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("No source matches {0:?}")]
    SourceNotFound(String),

    #[error(transparent)]
    Config(#[from] fl_core::CoreError),

    #[error(transparent)]
    Transport(#[from] fl_transport::TransportError),
}
