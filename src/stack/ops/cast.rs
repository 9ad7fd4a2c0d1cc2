use crate::{
    format::pixel::{PixelFormat, PixelInfo},
    foundation::error::TilestackResult,
    stack::{LazyTilestack, LruFrames, SharedTilestack, copy_frame},
};

use super::frames_like;

/// Re-encodes every band of an upstream stack into another numeric type.
///
/// Values are carried over unchanged; integer targets clamp and round as usual.
pub struct CastTilestack {
    src: SharedTilestack,
    src_pixel: PixelInfo,
    frames: LruFrames,
    scratch: Vec<f64>,
}

impl CastTilestack {
    pub fn new(
        src: SharedTilestack,
        pixel_format: PixelFormat,
        bits_per_band: u32,
    ) -> TilestackResult<Self> {
        let src_info = src.borrow().info();
        let mut info = src_info;
        info.pixel = PixelInfo::new(src_info.pixel.bands_per_pixel, bits_per_band, pixel_format)?;
        Ok(Self {
            frames: frames_like(&src, info)?,
            src,
            src_pixel: src_info.pixel,
            scratch: Vec::new(),
        })
    }
}

impl LazyTilestack for CastTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let src = copy_frame(&self.src, frame)?;
        self.src_pixel.decode_into(&src, &mut self.scratch)?;
        self.frames.info.pixel.encode_from(&self.scratch, dest)
    }
}

/// Cast to 32-bit float, the working format of the convolution operators.
pub(crate) fn to_float32(src: SharedTilestack) -> TilestackResult<CastTilestack> {
    CastTilestack::new(src, PixelFormat::Float, 32)
}

#[cfg(test)]
#[path = "../../../tests/unit/stack/ops/cast.rs"]
mod tests;
