use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use fl_core::{FourCC, FrameDescriptor, FrameRate};
use serde::{Deserialize, Serialize};

use crate::{Result, TransportError};

/// Everything about a frame except its pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameHeader {
    pub width: u32,
    pub height: u32,
    pub line_stride: u32,
    pub fourcc: u32,
    pub frame_rate_n: u32,
    pub frame_rate_d: u32,
    pub timecode_us: Option<u64>,
    pub metadata: Option<String>,
    pub data_len: u32,
}

impl FrameHeader {
    pub fn from_frame(frame: &FrameDescriptor) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            line_stride: frame.line_stride,
            fourcc: frame.fourcc.code(),
            frame_rate_n: frame.frame_rate.numerator,
            frame_rate_d: frame.frame_rate.denominator,
            timecode_us: frame.timecode.map(|t| t.as_micros() as u64),
            metadata: frame.metadata.clone(),
            data_len: frame.data.len() as u32,
        }
    }

    pub fn serialize(&self) -> Result<Bytes> {
        let config = bincode::config::standard();
        let encoded = bincode::serde::encode_to_vec(self, config)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        Ok(Bytes::from(encoded))
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        let config = bincode::config::standard();
        let (header, _): (FrameHeader, usize) = bincode::serde::decode_from_slice(data, config)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;
        Ok(header)
    }
}

/// Frame message format: [header_len:4][header:N][pixels:data_len]
pub fn encode_message(frame: &FrameDescriptor) -> Result<Bytes> {
    let header = FrameHeader::from_frame(frame).serialize()?;

    let mut buf = BytesMut::with_capacity(4 + header.len() + frame.data.len());
    buf.put_u32(header.len() as u32);
    buf.put(header);
    buf.put(frame.data.clone());

    Ok(buf.freeze())
}

pub fn decode_message(mut message: Bytes) -> Result<FrameDescriptor> {
    if message.len() < 4 {
        return Err(TransportError::Serialization("Message too short".into()));
    }

    let header_len = message.get_u32() as usize;
    if message.len() < header_len {
        return Err(TransportError::Serialization("Incomplete frame header".into()));
    }

    let header = FrameHeader::deserialize(&message.split_to(header_len))?;
    if message.len() != header.data_len as usize {
        return Err(TransportError::Serialization(format!(
            "Frame payload is {} bytes, header says {}",
            message.len(),
            header.data_len
        )));
    }

    Ok(FrameDescriptor {
        width: header.width,
        height: header.height,
        line_stride: header.line_stride,
        fourcc: FourCC::from_code(header.fourcc),
        frame_rate: FrameRate::new(header.frame_rate_n, header.frame_rate_d),
        timecode: header.timecode_us.map(Duration::from_micros),
        data: message,
        metadata: header.metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_carries_header_and_pixels() {
        let frame = FrameDescriptor::new(2, 1, 8, FourCC::BGRA, vec![5u8; 8])
            .with_frame_rate(FrameRate::new(30000, 1001))
            .with_timecode(Some(Duration::from_millis(1500)))
            .with_metadata("<ndi_capabilities/>");

        let decoded = decode_message(encode_message(&frame).unwrap()).unwrap();

        assert_eq!(decoded.fourcc, FourCC::BGRA);
        assert_eq!(decoded.line_stride, 8);
        assert_eq!(decoded.frame_rate, FrameRate::new(30000, 1001));
        assert_eq!(decoded.timecode, Some(Duration::from_millis(1500)));
        assert_eq!(decoded.metadata.as_deref(), Some("<ndi_capabilities/>"));
        assert_eq!(decoded.data, frame.data);
    }

    #[test]
    fn test_truncated_message_is_rejected() {
        let frame = FrameDescriptor::new(1, 1, 4, FourCC::BGRA, vec![1u8; 4]);
        let message = encode_message(&frame).unwrap();

        assert!(decode_message(message.slice(..message.len() - 1)).is_err());
        assert!(decode_message(Bytes::from_static(&[0, 0])).is_err());
    }
}
