//! Pixel format conversion between engine readback layouts and wire layouts.
//!
//! [`encode`] runs on the capture side, turning a render-target readback into
//! a [`FrameDescriptor`](fl_core::FrameDescriptor) ready for the send queue.
//! [`decode`] runs on the receive side, turning a received descriptor into a
//! [`VideoSample`](fl_core::VideoSample) the playback sink accepts.

use fl_core::FourCC;
use thiserror::Error;

pub mod decode;
pub mod encode;
pub mod v210;

pub use decode::{decode_metadata, decode_video};
pub use encode::encode_frame;

pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Unsupported pixel format: {0}")]
    Unsupported(FourCC),

    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("Invalid frame geometry: {0}")]
    InvalidGeometry(String),
}

pub(crate) fn ensure_len(actual: usize, needed: usize) -> Result<()> {
    if actual < needed {
        return Err(ConvertError::BufferTooSmall { needed, actual });
    }
    Ok(())
}

/// Multiply frame dimensions, rejecting products that overflow.
pub(crate) fn checked_size(factors: &[usize]) -> Result<usize> {
    factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .ok_or_else(|| ConvertError::InvalidGeometry(format!("frame size {:?} overflows", factors)))
}

#[inline]
pub(crate) fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([buf[offset], buf[offset + 1]])
}

#[inline]
pub(crate) fn write_u16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}
