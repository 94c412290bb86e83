use fl_core::{FourCC, FrameDescriptor, OutputPixelFormat};
use tracing::trace;

use crate::v210::{self, BYTES_PER_GROUP, PIXELS_PER_GROUP};
use crate::{checked_size, ensure_len, ConvertError, Result};

/// Bytes per P216 output pixel as laid out by the capture path (four 16-bit channels).
pub const P216_BYTES_PER_PIXEL: usize = 8;

/// Convert a render-target readback into an on-wire frame.
///
/// `width`, `height` and `bytes_per_row` describe the readback as the engine
/// hands it over. For [`OutputPixelFormat::P210`] the readback is V210 and
/// `width` counts 16-byte texels of six pixels each.
pub fn encode_frame(
    format: OutputPixelFormat,
    buffer: &[u8],
    width: u32,
    height: u32,
    bytes_per_row: u32,
) -> Result<FrameDescriptor> {
    if width == 0 || height == 0 {
        return Err(ConvertError::InvalidGeometry(format!("empty readback {}x{}", width, height)));
    }

    match format {
        OutputPixelFormat::Rgb => encode_bgra(buffer, width, height, bytes_per_row),
        OutputPixelFormat::P210 => encode_p216(buffer, width, height, bytes_per_row),
    }
}

/// Copy an 8-bit BGRA readback as is; alpha is expected to be correct already.
fn encode_bgra(buffer: &[u8], width: u32, height: u32, bytes_per_row: u32) -> Result<FrameDescriptor> {
    let stride = bytes_per_row as usize;
    if stride < width as usize * 4 {
        return Err(ConvertError::InvalidGeometry(format!(
            "BGRA row of {} bytes cannot hold {} pixels",
            stride, width
        )));
    }

    let size = checked_size(&[stride, height as usize])?;
    ensure_len(buffer.len(), size)?;

    trace!("BGRA copy {}x{}, {} bytes", width, height, size);

    Ok(FrameDescriptor::new(
        width,
        height,
        bytes_per_row,
        FourCC::BGRA,
        buffer[..size].to_vec(),
    ))
}

/// Expand a V210 readback into a 16-bit P216 frame.
fn encode_p216(buffer: &[u8], width: u32, height: u32, bytes_per_row: u32) -> Result<FrameDescriptor> {
    let groups = width as usize;
    let rows = height as usize;
    let xres = checked_size(&[groups, PIXELS_PER_GROUP])?;
    let line_stride = checked_size(&[xres, P216_BYTES_PER_PIXEL])?;
    let (xres_u32, line_stride_u32) = match (u32::try_from(xres), u32::try_from(line_stride)) {
        (Ok(x), Ok(stride)) => (x, stride),
        _ => {
            return Err(ConvertError::InvalidGeometry(format!(
                "{} V210 texels do not fit a P216 frame",
                groups
            )));
        }
    };

    let row_bytes = checked_size(&[groups, BYTES_PER_GROUP])?;
    let src_stride = if bytes_per_row == 0 {
        row_bytes
    } else {
        bytes_per_row as usize
    };

    // Check the source before allocating the output.
    ensure_len(
        buffer.len(),
        checked_size(&[src_stride, rows.saturating_sub(1)])?.saturating_add(row_bytes),
    )?;

    let mut data = vec![0u8; checked_size(&[line_stride, rows, 2])?];
    v210::transcode_to_p216(buffer, src_stride, groups, rows, &mut data, line_stride)?;

    trace!("V210 -> P216 {}x{} (stride {})", xres, rows, line_stride);

    Ok(FrameDescriptor::new(
        xres_u32,
        height,
        line_stride_u32,
        FourCC::P216,
        data,
    ))
}
