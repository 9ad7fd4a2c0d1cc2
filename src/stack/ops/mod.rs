//! Derived tilestacks.
//!
//! Each operator validates its inputs' [`TilestackInfo`] when constructed and computes nothing
//! until a frame is pulled. Inputs are held as [`SharedTilestack`] handles.

use crate::{
    format::pixel::TilestackInfo,
    foundation::error::{TilestackError, TilestackResult},
    stack::{LruFrames, SharedTilestack, default_lru_size, timestamps_of},
};

pub mod arith;
pub mod blur;
pub mod cast;
pub mod composite;
pub mod concat;
pub mod synthetic;
pub mod viz;

/// Frame window for a derived stack that inherits `src`'s timestamps.
pub(crate) fn frames_like(src: &SharedTilestack, info: TilestackInfo) -> TilestackResult<LruFrames> {
    Ok(LruFrames::new(info, default_lru_size()).with_timestamps(timestamps_of(src)?))
}

/// Require identical tile size, pixel layout and frame count.
pub(crate) fn check_same_geometry(
    op: &str,
    a: &TilestackInfo,
    b: &TilestackInfo,
) -> TilestackResult<()> {
    if a.tile_width != b.tile_width || a.tile_height != b.tile_height {
        return Err(TilestackError::geometry(format!(
            "{op}: tile sizes differ ({}x{} vs {}x{})",
            a.tile_width, a.tile_height, b.tile_width, b.tile_height
        )));
    }
    if a.pixel.bands_per_pixel != b.pixel.bands_per_pixel {
        return Err(TilestackError::geometry(format!(
            "{op}: band counts differ ({} vs {})",
            a.pixel.bands_per_pixel, b.pixel.bands_per_pixel
        )));
    }
    if a.pixel != b.pixel {
        return Err(TilestackError::geometry(format!(
            "{op}: pixel types differ ({}-bit {:?} vs {}-bit {:?})",
            a.pixel.bits_per_band, a.pixel.pixel_format, b.pixel.bits_per_band, b.pixel.pixel_format
        )));
    }
    if a.nframes != b.nframes {
        return Err(TilestackError::geometry(format!(
            "{op}: frame counts differ ({} vs {})",
            a.nframes, b.nframes
        )));
    }
    Ok(())
}
