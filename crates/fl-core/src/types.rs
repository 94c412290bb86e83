use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

const fn fourcc(code: &[u8; 4]) -> u32 {
    (code[0] as u32) | (code[1] as u32) << 8 | (code[2] as u32) << 16 | (code[3] as u32) << 24
}

/// Pixel layout tag carried by every frame on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FourCC {
    BGRA,
    BGRX,
    RGBA,
    RGBX,
    /// 8-bit 4:2:2, packed U0 Y0 V0 Y1.
    UYVY,
    /// UYVY followed by an 8-bit alpha plane.
    UYVA,
    /// 16-bit 4:2:2, a luma plane followed by an interleaved CbCr plane.
    P216,
    /// P216 followed by a 16-bit alpha plane.
    PA16,
    /// 10-bit 4:2:2 packed into 32-bit words, six pixels per 16 bytes.
    V210,
    I420,
    NV12,
    YV12,
    Unknown(u32),
}

impl FourCC {
    pub const fn code(self) -> u32 {
        match self {
            FourCC::BGRA => fourcc(b"BGRA"),
            FourCC::BGRX => fourcc(b"BGRX"),
            FourCC::RGBA => fourcc(b"RGBA"),
            FourCC::RGBX => fourcc(b"RGBX"),
            FourCC::UYVY => fourcc(b"UYVY"),
            FourCC::UYVA => fourcc(b"UYVA"),
            FourCC::P216 => fourcc(b"P216"),
            FourCC::PA16 => fourcc(b"PA16"),
            FourCC::V210 => fourcc(b"V210"),
            FourCC::I420 => fourcc(b"I420"),
            FourCC::NV12 => fourcc(b"NV12"),
            FourCC::YV12 => fourcc(b"YV12"),
            FourCC::Unknown(code) => code,
        }
    }

    pub fn from_code(code: u32) -> Self {
        const KNOWN: [FourCC; 12] = [
            FourCC::BGRA,
            FourCC::BGRX,
            FourCC::RGBA,
            FourCC::RGBX,
            FourCC::UYVY,
            FourCC::UYVA,
            FourCC::P216,
            FourCC::PA16,
            FourCC::V210,
            FourCC::I420,
            FourCC::NV12,
            FourCC::YV12,
        ];

        KNOWN
            .into_iter()
            .find(|tag| tag.code() == code)
            .unwrap_or(FourCC::Unknown(code))
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.code().to_le_bytes();
        if bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
            for b in bytes {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(f, "0x{:08x}", self.code())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }

    pub fn as_f64(&self) -> f64 {
        if self.denominator == 0 {
            return 0.0;
        }
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame, `None` for a zero rate.
    pub fn frame_duration(&self) -> Option<Duration> {
        if self.numerator == 0 || self.denominator == 0 {
            return None;
        }
        let nanos = 1_000_000_000u128 * self.denominator as u128 / self.numerator as u128;
        Some(Duration::from_nanos(nanos as u64))
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new(60, 1)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// A single video frame as handed to or received from the transport.
#[derive(Debug, Clone)]
pub struct FrameDescriptor {
    pub width: u32,
    pub height: u32,
    pub line_stride: u32,
    pub fourcc: FourCC,
    pub frame_rate: FrameRate,
    pub timecode: Option<Duration>,
    pub data: Bytes,
    pub metadata: Option<String>,
}

impl FrameDescriptor {
    pub fn new(width: u32, height: u32, line_stride: u32, fourcc: FourCC, data: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            line_stride,
            fourcc,
            frame_rate: FrameRate::default(),
            timecode: None,
            data: data.into(),
            metadata: None,
        }
    }

    /// An empty frame used to pre-seed the send queue.
    pub fn placeholder() -> Self {
        Self::new(0, 0, 0, FourCC::BGRA, Bytes::new())
    }

    pub fn is_placeholder(&self) -> bool {
        self.data.is_empty() && self.width == 0 && self.height == 0
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_timecode(mut self, timecode: Option<Duration>) -> Self {
        self.timecode = timecode;
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Target layouts a sample sink accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleFormat {
    CharBgra,
    CharUyvy,
    /// 16-bit A, Y, Cb, Cr per pixel.
    Y416,
}

impl SampleFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            SampleFormat::CharBgra => 4,
            SampleFormat::CharUyvy => 2,
            SampleFormat::Y416 => 8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoSample {
    pub data: Bytes,
    pub stride: u32,
    pub width: u32,
    pub height: u32,
    pub format: SampleFormat,
    pub time: Duration,
    pub frame_rate: FrameRate,
    pub timecode: Option<Duration>,
}

impl VideoSample {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

#[derive(Debug, Clone)]
pub struct MetadataSample {
    pub data: Bytes,
    pub time: Duration,
    pub frame_rate: FrameRate,
    pub timecode: Option<Duration>,
}

/// Pixel layout produced by the capture side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputPixelFormat {
    #[default]
    Rgb,
    P210,
}

/// A source advertised on the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NetworkSource {
    /// Full advertised name, usually `MACHINE (SOURCE)`.
    pub name: String,
    pub address: Option<String>,
}

impl NetworkSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: None,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}

impl fmt::Display for NetworkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Some(address) => write!(f, "{} @ {}", self.name, address),
            None => write!(f, "{}", self.name),
        }
    }
}
