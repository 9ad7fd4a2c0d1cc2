use crate::{
    foundation::error::{TilestackError, TilestackResult},
    stack::{LazyTilestack, LruFrames, SharedTilestack, default_lru_size, timestamps_of},
};

/// Several stacks of identical frame geometry, appended along the frame axis.
pub struct ConcatTilestack {
    srcs: Vec<SharedTilestack>,
    /// `starts[i]` is the first global frame owned by `srcs[i]`.
    starts: Vec<usize>,
    frames: LruFrames,
}

impl ConcatTilestack {
    pub fn new(srcs: Vec<SharedTilestack>) -> TilestackResult<Self> {
        let Some(first) = srcs.first() else {
            return Err(TilestackError::usage("concatenation needs at least one tilestack"));
        };
        let base = first.borrow().info();

        let mut starts = Vec::with_capacity(srcs.len());
        let mut timestamps = Vec::new();
        for (i, src) in srcs.iter().enumerate() {
            let info = src.borrow().info();
            if !info.same_frame_geometry(&base) {
                return Err(TilestackError::geometry(format!(
                    "cat: tilestack {i} is {}x{} with {} bands of {} bits, expected {}x{} with {} bands of {} bits",
                    info.tile_width,
                    info.tile_height,
                    info.pixel.bands_per_pixel,
                    info.pixel.bits_per_band,
                    base.tile_width,
                    base.tile_height,
                    base.pixel.bands_per_pixel,
                    base.pixel.bits_per_band,
                )));
            }
            starts.push(timestamps.len());
            timestamps.extend(timestamps_of(src)?);
        }

        let info = base.with_nframes(timestamps.len());
        Ok(Self {
            frames: LruFrames::new(info, default_lru_size()).with_timestamps(timestamps),
            srcs,
            starts,
        })
    }

    /// Which source owns global `frame`, and its index within that source.
    fn locate(&self, frame: usize) -> TilestackResult<(usize, usize)> {
        self.frames.check_frame(frame)?;
        let src = self.starts.partition_point(|&s| s <= frame) - 1;
        Ok((src, frame - self.starts[src]))
    }
}

impl LazyTilestack for ConcatTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let (src, local) = self.locate(frame)?;
        let mut src = self.srcs[src].borrow_mut();
        dest.copy_from_slice(src.frame_pixels(local)?);
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/stack/ops/concat.rs"]
mod tests;
