//! V210 (10-bit packed 4:2:2) unpacking.
//!
//! Each 16-byte group holds four little-endian 32-bit words, three 10-bit
//! components per word, covering six pixels:
//!
//! ```text
//! w0: Cb0 Y0  Cr0
//! w1: Y1  Cb1 Y2
//! w2: Cr1 Y3  Cb2
//! w3: Y4  Cr2 Y5
//! ```

use crate::{checked_size, ensure_len, write_u16, ConvertError, Result};

pub const PIXELS_PER_GROUP: usize = 6;
pub const BYTES_PER_GROUP: usize = 16;

const MASK_10: u32 = 0x3FF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct V210Group {
    pub y: [u16; 6],
    pub cb: [u16; 3],
    pub cr: [u16; 3],
}

impl V210Group {
    pub fn unpack(block: &[u8]) -> Self {
        let word = |i: usize| {
            u32::from_le_bytes([block[i * 4], block[i * 4 + 1], block[i * 4 + 2], block[i * 4 + 3]])
        };
        let component = |w: u32, slot: u32| ((w >> (slot * 10)) & MASK_10) as u16;

        let (w0, w1, w2, w3) = (word(0), word(1), word(2), word(3));

        Self {
            y: [
                component(w0, 1),
                component(w1, 0),
                component(w1, 2),
                component(w2, 1),
                component(w3, 0),
                component(w3, 2),
            ],
            cb: [component(w0, 0), component(w1, 1), component(w2, 2)],
            cr: [component(w0, 2), component(w2, 0), component(w3, 1)],
        }
    }

    pub fn pack(&self) -> [u8; BYTES_PER_GROUP] {
        let word = |a: u16, b: u16, c: u16| {
            (a as u32 & MASK_10) | (b as u32 & MASK_10) << 10 | (c as u32 & MASK_10) << 20
        };

        let words = [
            word(self.cb[0], self.y[0], self.cr[0]),
            word(self.y[1], self.cb[1], self.y[2]),
            word(self.cr[1], self.y[3], self.cb[2]),
            word(self.y[4], self.cr[2], self.y[5]),
        ];

        let mut out = [0u8; BYTES_PER_GROUP];
        for (chunk, w) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&w.to_le_bytes());
        }
        out
    }
}

/// Widen a 10-bit component to the 16-bit range.
#[inline]
pub fn widen(value: u16) -> u16 {
    value << 6
}

/// Transcode `groups` V210 groups per row into a P216 buffer.
///
/// The luma plane starts at offset 0 and the interleaved CbCr plane at
/// `dst_stride * height`; both planes advance by `dst_stride` per row.
pub fn transcode_to_p216(
    src: &[u8],
    src_stride: usize,
    groups: usize,
    height: usize,
    dst: &mut [u8],
    dst_stride: usize,
) -> Result<()> {
    let row_bytes = checked_size(&[groups, BYTES_PER_GROUP])?;
    let xres = checked_size(&[groups, PIXELS_PER_GROUP])?;

    if src_stride < row_bytes {
        return Err(ConvertError::InvalidGeometry(format!(
            "V210 row stride {} shorter than {} groups",
            src_stride, groups
        )));
    }
    if dst_stride < checked_size(&[xres, 2])? {
        return Err(ConvertError::InvalidGeometry(format!(
            "P216 stride {} shorter than {} pixels",
            dst_stride, xres
        )));
    }
    if height == 0 || groups == 0 {
        return Ok(());
    }

    ensure_len(src.len(), checked_size(&[src_stride, height - 1])?.saturating_add(row_bytes))?;
    let chroma_plane = checked_size(&[dst_stride, height])?;
    ensure_len(dst.len(), checked_size(&[chroma_plane, 2])?)?;

    for row in 0..height {
        let src_row = &src[row * src_stride..row * src_stride + row_bytes];
        let luma = row * dst_stride;
        let chroma = chroma_plane + row * dst_stride;

        for (g, block) in src_row.chunks_exact(BYTES_PER_GROUP).enumerate() {
            let group = V210Group::unpack(block);
            let first = g * PIXELS_PER_GROUP;

            for (i, y) in group.y.iter().enumerate() {
                write_u16(dst, luma + (first + i) * 2, widen(*y));
            }

            for pair in 0..3 {
                let offset = chroma + (first + pair * 2) * 2;
                write_u16(dst, offset, widen(group.cb[pair]));
                write_u16(dst, offset + 2, widen(group.cr[pair]));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_u16;

    fn sample_group() -> V210Group {
        V210Group {
            y: [64, 100, 200, 300, 512, 940],
            cb: [512, 448, 576],
            cr: [512, 600, 400],
        }
    }

    #[test]
    fn test_pack_unpack_group() {
        let group = sample_group();
        assert_eq!(V210Group::unpack(&group.pack()), group);
    }

    #[test]
    fn test_component_positions() {
        let block = sample_group().pack();
        let w0 = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        assert_eq!(w0 & MASK_10, 512); // Cb0
        assert_eq!((w0 >> 10) & MASK_10, 64); // Y0
        assert_eq!((w0 >> 20) & MASK_10, 512); // Cr0
    }

    #[test]
    fn test_transcode_single_group() {
        let src = sample_group().pack();
        let dst_stride = 6 * 8;
        let mut dst = vec![0u8; dst_stride * 2];

        transcode_to_p216(&src, 16, 1, 1, &mut dst, dst_stride).unwrap();

        assert_eq!(read_u16(&dst, 0), 64 << 6);
        assert_eq!(read_u16(&dst, 10), 940 << 6);

        // Chroma plane begins one luma plane in.
        assert_eq!(read_u16(&dst, dst_stride), 512 << 6);
        assert_eq!(read_u16(&dst, dst_stride + 4), 448 << 6);
        assert_eq!(read_u16(&dst, dst_stride + 6), 600 << 6);
    }

    #[test]
    fn test_transcode_rejects_short_source() {
        let mut dst = vec![0u8; 96];
        let err = transcode_to_p216(&[0u8; 8], 16, 1, 1, &mut dst, 48).unwrap_err();
        assert!(matches!(err, ConvertError::BufferTooSmall { needed: 16, actual: 8 }));
    }
}
