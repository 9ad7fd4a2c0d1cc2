use crate::{
    format::pixel::{CompressionFormat, PixelFormat, PixelInfo, TilestackInfo},
    foundation::{error::TilestackResult, math::Mwc},
    stack::{LazyTilestack, LruFrames, SharedTilestack, default_lru_size, timestamps_of},
};

/// Zero-filled integer frames with no upstream source.
pub struct BlackTilestack {
    frames: LruFrames,
}

impl BlackTilestack {
    pub fn new(
        nframes: usize,
        width: u32,
        height: u32,
        bands_per_pixel: u32,
        bits_per_band: u32,
    ) -> TilestackResult<Self> {
        let info = TilestackInfo {
            pixel: PixelInfo::new(bands_per_pixel, bits_per_band, PixelFormat::Integer)?,
            nframes,
            tile_width: width,
            tile_height: height,
            compression_format: CompressionFormat::None,
        };
        Ok(Self {
            frames: LruFrames::new(info, default_lru_size()),
        })
    }
}

impl LazyTilestack for BlackTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, _frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        dest.fill(0);
        Ok(())
    }
}

/// Pixels sharing one noise value in a leader frame.
const LEADER_RUN: usize = 8;

/// A countdown leader of `leader_nframes` frames followed by the source.
///
/// Frame 0 is black, the last two leader frames repeat source frame 0, and the frames in
/// between are coarse grey noise seeded by frame index.
pub struct PrependLeaderTilestack {
    src: SharedTilestack,
    leader_nframes: usize,
    frames: LruFrames,
}

impl PrependLeaderTilestack {
    pub fn new(src: SharedTilestack, leader_nframes: usize) -> TilestackResult<Self> {
        let info = src.borrow().info();
        let timestamps = std::iter::repeat_n(0.0, leader_nframes).chain(timestamps_of(&src)?);
        Ok(Self {
            frames: LruFrames::new(info.with_nframes(leader_nframes + info.nframes), default_lru_size())
                .with_timestamps(timestamps),
            src,
            leader_nframes,
        })
    }

    fn copy_source(&self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let mut src = self.src.borrow_mut();
        dest.copy_from_slice(src.frame_pixels(frame)?);
        Ok(())
    }
}

/// Fill `dest` with the noise pattern of leader `frame`.
pub(crate) fn leader_noise(frame: usize, bytes_per_pixel: usize, dest: &mut [u8]) {
    let seed = (frame as u32).wrapping_add(1);
    let mut rng = Mwc::new(seed.wrapping_mul(4_294_967_291), seed.wrapping_mul(3_537_812_053));
    for run in dest.chunks_mut(LEADER_RUN * bytes_per_pixel) {
        run.fill(rng.next_byte() / 4 + 96);
    }
}

impl LazyTilestack for PrependLeaderTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let n = self.leader_nframes;
        if frame >= n {
            self.copy_source(frame - n, dest)
        } else if n >= 2 && frame >= n - 2 {
            self.copy_source(0, dest)
        } else if frame == 0 {
            dest.fill(0);
            Ok(())
        } else {
            leader_noise(frame, self.frames.info.bytes_per_pixel(), dest);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/stack/ops/synthetic.rs"]
mod tests;
