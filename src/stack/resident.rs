use std::io::Write;

use crate::{
    format::container::{self, TocEntry},
    format::pixel::{CompressionFormat, TilestackInfo},
    foundation::error::{TilestackError, TilestackResult},
    stack::{SharedTilestack, Tilestack},
};

/// All frames held in one contiguous allocation, created up front. Never evicts.
#[derive(Clone, Debug)]
pub struct ResidentTilestack {
    info: TilestackInfo,
    toc: Vec<TocEntry>,
    all_pixels: Vec<u8>,
}

impl ResidentTilestack {
    /// Zero-filled stack with the given layout.
    pub fn new(info: TilestackInfo) -> TilestackResult<Self> {
        info.pixel.validate()?;
        let total = info
            .bytes_per_frame()
            .checked_mul(info.nframes)
            .ok_or_else(|| TilestackError::geometry("resident tilestack size overflow"))?;
        Ok(Self {
            info,
            toc: vec![TocEntry::default(); info.nframes],
            all_pixels: vec![0u8; total],
        })
    }

    /// Wrap frames already laid out back to back in `all_pixels`.
    pub fn from_pixels(info: TilestackInfo, all_pixels: Vec<u8>) -> TilestackResult<Self> {
        info.pixel.validate()?;
        let expected = info.bytes_per_frame() * info.nframes;
        if all_pixels.len() != expected {
            return Err(TilestackError::geometry(format!(
                "{} bytes given for {} frames of {} bytes",
                all_pixels.len(),
                info.nframes,
                info.bytes_per_frame()
            )));
        }
        Ok(Self {
            info,
            toc: vec![TocEntry::default(); info.nframes],
            all_pixels,
        })
    }

    /// Copy every frame of `src` into a new resident stack.
    pub fn materialize(src: &mut dyn Tilestack) -> TilestackResult<Self> {
        let mut out = Self::new(src.info())?;
        for frame in 0..out.info.nframes {
            out.toc[frame].timestamp = src.frame_timestamp(frame)?;
            let pixels = src.frame_pixels(frame)?;
            out.frame_pixels_mut(frame)?.copy_from_slice(pixels);
        }
        Ok(out)
    }

    pub fn frame_pixels_mut(&mut self, frame: usize) -> TilestackResult<&mut [u8]> {
        let range = self.frame_range(frame)?;
        Ok(&mut self.all_pixels[range])
    }

    pub fn set_timestamp(&mut self, frame: usize, timestamp: f64) -> TilestackResult<()> {
        self.frame_range(frame)?;
        self.toc[frame].timestamp = timestamp;
        Ok(())
    }

    /// Write this stack as a `.ts2` container.
    pub fn write<W: Write>(&mut self, sink: &mut W, compression: CompressionFormat) -> TilestackResult<u64> {
        container::write_tilestack(self, sink, compression)
    }

    fn frame_range(&self, frame: usize) -> TilestackResult<std::ops::Range<usize>> {
        if frame >= self.info.nframes {
            return Err(TilestackError::geometry(format!(
                "frame {frame} requested from a stack of {} frames",
                self.info.nframes
            )));
        }
        let n = self.info.bytes_per_frame();
        Ok(frame * n..(frame + 1) * n)
    }
}

impl Tilestack for ResidentTilestack {
    fn info(&self) -> TilestackInfo {
        self.info
    }

    fn frame_timestamp(&self, frame: usize) -> TilestackResult<f64> {
        self.frame_range(frame)?;
        Ok(self.toc[frame].timestamp)
    }

    fn frame_pixels(&mut self, frame: usize) -> TilestackResult<&[u8]> {
        let range = self.frame_range(frame)?;
        Ok(&self.all_pixels[range])
    }

    fn is_resident(&self, frame: usize) -> bool {
        frame < self.info.nframes
    }

    fn resident_count(&self) -> usize {
        self.info.nframes
    }

    fn as_resident_mut(&mut self) -> Option<&mut ResidentTilestack> {
        Some(self)
    }
}

/// Run `f` on `src` as a resident stack.
///
/// A stack that is already resident is used in place; anything else is materialized into a
/// temporary copy first.
pub fn ensure_resident<T>(
    src: &SharedTilestack,
    f: impl FnOnce(&mut ResidentTilestack) -> TilestackResult<T>,
) -> TilestackResult<T> {
    let mut src = src.borrow_mut();
    if let Some(resident) = src.as_resident_mut() {
        return f(resident);
    }
    let mut copy = ResidentTilestack::materialize(&mut *src)?;
    drop(src);
    f(&mut copy)
}

#[cfg(test)]
#[path = "../../tests/unit/stack/resident.rs"]
mod tests;
