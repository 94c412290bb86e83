use std::time::Duration;

use bytes::Bytes;
use fl_core::{FourCC, FrameDescriptor, MetadataSample, SampleFormat, VideoSample};
use tracing::trace;

use crate::{checked_size, ensure_len, read_u16, write_u16, ConvertError, Result};

const OPAQUE: u16 = 0xFFFF;

/// Where the alpha channel of a 16-bit 4:2:2 frame comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alpha {
    Opaque,
    Plane,
}

/// Convert a received frame into a sample in one of the sink's formats.
pub fn decode_video(frame: &FrameDescriptor, time: Duration) -> Result<VideoSample> {
    match frame.fourcc {
        FourCC::BGRA | FourCC::BGRX => passthrough(frame, SampleFormat::CharBgra, time),
        FourCC::UYVY => passthrough(frame, SampleFormat::CharUyvy, time),
        FourCC::P216 => decode_planar16(frame, Alpha::Opaque, time),
        FourCC::PA16 => decode_planar16(frame, Alpha::Plane, time),
        other => Err(ConvertError::Unsupported(other)),
    }
}

/// Wrap the frame's metadata blob, if any, into a binary sample.
pub fn decode_metadata(frame: &FrameDescriptor, time: Duration) -> Option<MetadataSample> {
    let metadata = frame.metadata.as_ref()?;

    Some(MetadataSample {
        data: Bytes::copy_from_slice(metadata.as_bytes()),
        time,
        frame_rate: frame.frame_rate,
        timecode: frame.timecode,
    })
}

fn passthrough(frame: &FrameDescriptor, format: SampleFormat, time: Duration) -> Result<VideoSample> {
    let min_stride = checked_size(&[frame.width as usize, format.bytes_per_pixel() as usize])?;
    if (frame.line_stride as usize) < min_stride {
        return Err(ConvertError::InvalidGeometry(format!(
            "{} stride {} shorter than {} bytes",
            frame.fourcc, frame.line_stride, min_stride
        )));
    }

    let size = checked_size(&[frame.line_stride as usize, frame.height as usize])?;
    ensure_len(frame.data.len(), size)?;

    Ok(VideoSample {
        data: frame.data.slice(..size),
        stride: frame.line_stride,
        width: frame.width,
        height: frame.height,
        format,
        time,
        frame_rate: frame.frame_rate,
        timecode: frame.timecode,
    })
}

/// Interleave P216/PA16 planes into Y416 (`A Y Cb Cr`, 16 bits each).
///
/// Each CbCr pair covers two horizontally adjacent luma samples and is
/// replicated onto both output pixels.
fn decode_planar16(frame: &FrameDescriptor, alpha: Alpha, time: Duration) -> Result<VideoSample> {
    let width = frame.width as usize;
    let height = frame.height as usize;

    // A chroma row holds one Cb/Cr pair per two pixels, rounded up.
    let chroma_row = checked_size(&[width.div_ceil(2), 4])?;
    let luma_row = checked_size(&[width, 2])?;
    let src_stride = match frame.line_stride as usize {
        0 => chroma_row.max(luma_row),
        stride => stride,
    };

    if src_stride < chroma_row.max(luma_row) {
        return Err(ConvertError::InvalidGeometry(format!(
            "{} stride {} too short for width {}",
            frame.fourcc, src_stride, width
        )));
    }

    let planes = match alpha {
        Alpha::Opaque => 2,
        Alpha::Plane => 3,
    };
    let plane_size = checked_size(&[src_stride, height])?;
    let src = &frame.data[..];
    ensure_len(src.len(), checked_size(&[plane_size, planes])?)?;

    let dst_stride = checked_size(&[width, 8])?;
    let mut dst = vec![0u8; checked_size(&[dst_stride, height])?];

    for row in 0..height {
        let luma = row * src_stride;
        let chroma = plane_size + row * src_stride;
        let alpha_row = plane_size * 2 + row * src_stride;
        let out = row * dst_stride;

        for x in 0..width {
            let pair = (x / 2) * 4;
            let a = match alpha {
                Alpha::Opaque => OPAQUE,
                Alpha::Plane => read_u16(src, alpha_row + x * 2),
            };
            let px = out + x * 8;

            write_u16(&mut dst, px, a);
            write_u16(&mut dst, px + 2, read_u16(src, luma + x * 2));
            write_u16(&mut dst, px + 4, read_u16(src, chroma + pair));
            write_u16(&mut dst, px + 6, read_u16(src, chroma + pair + 2));
        }
    }

    trace!("{} -> Y416 {}x{}", frame.fourcc, width, height);

    Ok(VideoSample {
        data: Bytes::from(dst),
        stride: u32::try_from(dst_stride)
            .map_err(|_| ConvertError::InvalidGeometry(format!("Y416 stride {} overflows", dst_stride)))?,
        width: frame.width,
        height: frame.height,
        format: SampleFormat::Y416,
        time,
        frame_rate: frame.frame_rate,
        timecode: frame.timecode,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fl_core::FrameRate;

    fn planes16(planes: &[&[u16]]) -> Vec<u8> {
        planes
            .iter()
            .flat_map(|plane| plane.iter().flat_map(|v| v.to_le_bytes()))
            .collect()
    }

    fn pixel(sample: &VideoSample, x: usize) -> [u16; 4] {
        let base = x * 8;
        [
            read_u16(&sample.data, base),
            read_u16(&sample.data, base + 2),
            read_u16(&sample.data, base + 4),
            read_u16(&sample.data, base + 6),
        ]
    }

    #[test]
    fn test_p216_forces_opaque_alpha_and_replicates_chroma() {
        let data = planes16(&[&[0x1000, 0x2000], &[0x8000, 0x4000]]);
        let frame = FrameDescriptor::new(2, 1, 4, FourCC::P216, data);

        let sample = decode_video(&frame, Duration::ZERO).unwrap();

        assert_eq!(sample.format, SampleFormat::Y416);
        assert_eq!(sample.stride, 16);
        assert_eq!(pixel(&sample, 0), [0xFFFF, 0x1000, 0x8000, 0x4000]);
        assert_eq!(pixel(&sample, 1), [0xFFFF, 0x2000, 0x8000, 0x4000]);
    }

    #[test]
    fn test_pa16_reads_alpha_plane() {
        let data = planes16(&[&[0x1000, 0x2000], &[0x8000, 0x4000], &[0x0123, 0xABCD]]);
        let frame = FrameDescriptor::new(2, 1, 4, FourCC::PA16, data);

        let sample = decode_video(&frame, Duration::ZERO).unwrap();

        assert_eq!(pixel(&sample, 0), [0x0123, 0x1000, 0x8000, 0x4000]);
        assert_eq!(pixel(&sample, 1), [0xABCD, 0x2000, 0x8000, 0x4000]);
    }

    #[test]
    fn test_planar16_walks_stride() {
        // Width 2 with 8-byte rows: 4 bytes of padding per row in every plane.
        let data = planes16(&[
            &[1, 2, 0xEEEE, 0xEEEE, 3, 4, 0xEEEE, 0xEEEE],
            &[10, 11, 0xEEEE, 0xEEEE, 12, 13, 0xEEEE, 0xEEEE],
        ]);
        let frame = FrameDescriptor::new(2, 2, 8, FourCC::P216, data);

        let sample = decode_video(&frame, Duration::ZERO).unwrap();
        let row1 = sample.stride as usize / 8;

        assert_eq!(pixel(&sample, row1), [0xFFFF, 3, 12, 13]);
        assert_eq!(pixel(&sample, row1 + 1), [0xFFFF, 4, 12, 13]);
    }

    #[test]
    fn test_planar16_odd_width() {
        let data = planes16(&[&[1, 2, 3, 0], &[10, 11, 20, 21]]);
        let frame = FrameDescriptor::new(3, 1, 8, FourCC::P216, data);

        let sample = decode_video(&frame, Duration::ZERO).unwrap();

        assert_eq!(pixel(&sample, 2), [0xFFFF, 3, 20, 21]);
    }

    #[test]
    fn test_planar16_short_buffer() {
        let frame = FrameDescriptor::new(2, 1, 4, FourCC::PA16, vec![0u8; 8]);
        assert!(matches!(
            decode_video(&frame, Duration::ZERO),
            Err(ConvertError::BufferTooSmall { needed: 12, actual: 8 })
        ));
    }

    #[test]
    fn test_bgra_and_uyvy_pass_through() {
        let bgra = FrameDescriptor::new(2, 2, 8, FourCC::BGRX, vec![7u8; 16]);
        let sample = decode_video(&bgra, Duration::from_millis(5)).unwrap();
        assert_eq!(sample.format, SampleFormat::CharBgra);
        assert_eq!(sample.stride, 8);
        assert_eq!(sample.time, Duration::from_millis(5));
        assert_eq!(sample.data, bgra.data);

        let uyvy = FrameDescriptor::new(2, 1, 4, FourCC::UYVY, vec![1, 2, 3, 4]);
        let sample = decode_video(&uyvy, Duration::ZERO).unwrap();
        assert_eq!(sample.format, SampleFormat::CharUyvy);
        assert_eq!(&sample.data[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_unsupported_tag() {
        let frame = FrameDescriptor::new(2, 2, 2, FourCC::NV12, vec![0u8; 6]);
        assert!(matches!(
            decode_video(&frame, Duration::ZERO),
            Err(ConvertError::Unsupported(FourCC::NV12))
        ));
    }

    #[test]
    fn test_metadata_is_independent_of_video() {
        let frame = FrameDescriptor::new(1, 1, 1, FourCC::Unknown(42), vec![0u8])
            .with_frame_rate(FrameRate::new(25, 1))
            .with_metadata("<camera fov=\"90\"/>");

        assert!(decode_video(&frame, Duration::ZERO).is_err());

        let sample = decode_metadata(&frame, Duration::from_secs(1)).unwrap();
        assert_eq!(&sample.data[..], b"<camera fov=\"90\"/>");
        assert_eq!(sample.frame_rate, FrameRate::new(25, 1));
        assert!(decode_metadata(&FrameDescriptor::placeholder(), Duration::ZERO).is_none());
    }

    #[test]
    fn test_oversized_geometry_is_an_error() {
        let bgra = FrameDescriptor::new(0x4000_0001, 1, 16, FourCC::BGRA, vec![0u8; 16]);
        assert!(matches!(
            decode_video(&bgra, Duration::ZERO),
            Err(ConvertError::InvalidGeometry(_))
        ));

        let tall = FrameDescriptor::new(2, u32::MAX, u32::MAX, FourCC::BGRA, vec![0u8; 16]);
        assert!(decode_video(&tall, Duration::ZERO).is_err());

        let p216 = FrameDescriptor::new(u32::MAX, u32::MAX, u32::MAX, FourCC::PA16, vec![0u8; 64]);
        assert!(decode_video(&p216, Duration::ZERO).is_err());
    }
}
