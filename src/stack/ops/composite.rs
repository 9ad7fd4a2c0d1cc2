use crate::{
    format::pixel::PixelInfo,
    foundation::error::{TilestackError, TilestackResult},
    stack::{LazyTilestack, LruFrames, SharedTilestack, copy_frame},
};

use super::frames_like;

/// Alpha-blends `overlay` over `base`.
///
/// The overlay's last band is alpha, normalized by its maximum value. Output has the base's
/// layout: `overlay * alpha + base * (1 - alpha)` for each base band.
pub struct CompositeTilestack {
    base: SharedTilestack,
    overlay: SharedTilestack,
    overlay_pixel: PixelInfo,
    frames: LruFrames,
    base_values: Vec<f64>,
    overlay_values: Vec<f64>,
}

impl CompositeTilestack {
    pub fn new(base: SharedTilestack, overlay: SharedTilestack) -> TilestackResult<Self> {
        let b = base.borrow().info();
        let o = overlay.borrow().info();
        if b.tile_width != o.tile_width || b.tile_height != o.tile_height {
            return Err(TilestackError::geometry(format!(
                "composite: base is {}x{} but overlay is {}x{}",
                b.tile_width, b.tile_height, o.tile_width, o.tile_height
            )));
        }
        if b.nframes != o.nframes {
            return Err(TilestackError::geometry(format!(
                "composite: base has {} frames but overlay has {}",
                b.nframes, o.nframes
            )));
        }
        if o.pixel.bands_per_pixel <= b.pixel.bands_per_pixel {
            return Err(TilestackError::geometry(format!(
                "composite: overlay needs an alpha band beyond the base's {} bands (has {})",
                b.pixel.bands_per_pixel, o.pixel.bands_per_pixel
            )));
        }
        Ok(Self {
            frames: frames_like(&base, b)?,
            base,
            overlay,
            overlay_pixel: o.pixel,
            base_values: Vec::new(),
            overlay_values: Vec::new(),
        })
    }
}

impl LazyTilestack for CompositeTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let base_pixel = self.frames.info.pixel;
        base_pixel.decode_into(&copy_frame(&self.base, frame)?, &mut self.base_values)?;
        self.overlay_pixel
            .decode_into(&copy_frame(&self.overlay, frame)?, &mut self.overlay_values)?;

        let nb = base_pixel.bands_per_pixel as usize;
        let no = self.overlay_pixel.bands_per_pixel as usize;
        let alpha_scale = 1.0 / self.overlay_pixel.max_value();
        for (b, o) in self
            .base_values
            .chunks_exact_mut(nb)
            .zip(self.overlay_values.chunks_exact(no))
        {
            let alpha = o[no - 1] * alpha_scale;
            for (band, v) in b.iter_mut().enumerate() {
                *v = o[band] * alpha + *v * (1.0 - alpha);
            }
        }
        base_pixel.encode_from(&self.base_values, dest)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/stack/ops/composite.rs"]
mod tests;
