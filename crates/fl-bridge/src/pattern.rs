use clap::ValueEnum;
use fl_convert::v210::{BYTES_PER_GROUP, PIXELS_PER_GROUP, V210Group};
use fl_core::OutputPixelFormat;
use serde::{Deserialize, Serialize};

/// Synthetic content for the sender when no engine is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// Eight vertical colour bars scrolling one column per frame.
    Bars,
    /// Horizontal luma ramp with a pulsing alpha.
    Ramp,
    Solid,
}

/// One frame as a render-target readback would hand it over.
#[derive(Debug, Clone)]
pub struct Readback {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_row: u32,
}

/// BGRA values of the classic 75% bars.
const BARS: [[u8; 4]; 8] = [
    [180, 180, 180, 255],
    [16, 180, 180, 255],
    [180, 180, 16, 255],
    [16, 180, 16, 255],
    [180, 16, 180, 255],
    [16, 16, 180, 255],
    [180, 16, 16, 255],
    [16, 16, 16, 255],
];

/// 10-bit Y, Cb, Cr of the same bars.
const BARS_YCBCR: [[u16; 3]; 8] = [
    [721, 512, 512],
    [646, 176, 567],
    [525, 625, 176],
    [450, 289, 231],
    [335, 735, 793],
    [260, 399, 848],
    [139, 848, 457],
    [64, 512, 512],
];

pub struct PatternGenerator {
    pattern: Pattern,
    format: OutputPixelFormat,
    width: u32,
    height: u32,
}

impl PatternGenerator {
    /// `width` is in pixels; P210 output needs a multiple of six.
    pub fn new(pattern: Pattern, format: OutputPixelFormat, width: u32, height: u32) -> Self {
        Self {
            pattern,
            format,
            width,
            height,
        }
    }

    pub fn frame(&self, frame_number: u64) -> Readback {
        match self.format {
            OutputPixelFormat::Rgb => self.bgra(frame_number),
            OutputPixelFormat::P210 => self.v210(frame_number),
        }
    }

    fn bar_index(&self, x: u32, frame_number: u64) -> usize {
        let shifted = (x as u64 + frame_number) % self.width.max(1) as u64;
        (shifted * 8 / self.width.max(1) as u64) as usize
    }

    fn bgra(&self, frame_number: u64) -> Readback {
        let stride = self.width as usize * 4;
        let mut data = vec![0u8; stride * self.height as usize];

        for (y, row) in data.chunks_exact_mut(stride).enumerate() {
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let value = match self.pattern {
                    Pattern::Bars => BARS[self.bar_index(x as u32, frame_number)],
                    Pattern::Ramp => {
                        let v = (x * 255 / self.width.max(1) as usize) as u8;
                        let a = ((frame_number * 4 + y as u64) % 256) as u8;
                        [v, v, v, a]
                    }
                    Pattern::Solid => BARS[0],
                };
                px.copy_from_slice(&value);
            }
        }

        Readback {
            data,
            width: self.width,
            height: self.height,
            bytes_per_row: stride as u32,
        }
    }

    fn v210(&self, frame_number: u64) -> Readback {
        let groups = self.width as usize / PIXELS_PER_GROUP;
        let stride = groups * BYTES_PER_GROUP;
        let mut data = vec![0u8; stride * self.height as usize];

        for row in data.chunks_exact_mut(stride) {
            for (g, block) in row.chunks_exact_mut(BYTES_PER_GROUP).enumerate() {
                let mut group = V210Group::default();
                for i in 0..PIXELS_PER_GROUP {
                    let x = (g * PIXELS_PER_GROUP + i) as u32;
                    let [y, cb, cr] = self.ycbcr(x, frame_number);
                    group.y[i] = y;
                    if i % 2 == 0 {
                        group.cb[i / 2] = cb;
                        group.cr[i / 2] = cr;
                    }
                }
                block.copy_from_slice(&group.pack());
            }
        }

        Readback {
            data,
            width: groups as u32,
            height: self.height,
            bytes_per_row: stride as u32,
        }
    }

    fn ycbcr(&self, x: u32, frame_number: u64) -> [u16; 3] {
        match self.pattern {
            Pattern::Bars => BARS_YCBCR[self.bar_index(x, frame_number)],
            Pattern::Ramp => [64 + (x as u64 * 876 / self.width.max(1) as u64) as u16, 512, 512],
            Pattern::Solid => BARS_YCBCR[0],
        }
    }
}
