//! Pull-based tilestacks.
//!
//! Every stack answers [`Tilestack::frame_pixels`]; nothing is computed until a frame is asked
//! for. Leaf and derived stacks keep a small window of materialized frames in [`LruFrames`],
//! while [`resident::ResidentTilestack`] holds everything in one allocation.

use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use crate::{
    format::container::TocEntry,
    format::pixel::TilestackInfo,
    foundation::error::{TilestackError, TilestackResult},
};

pub mod ops;
pub mod reader;
pub mod resident;

/// Frames kept resident by default (plus the one being created).
pub const DEFAULT_LRU_SIZE: usize = 5;

/// Capacity used by new lazily-evaluated stacks.
///
/// `TILESTACK_LRU_FRAMES` overrides [`DEFAULT_LRU_SIZE`]; non-positive or unparsable values
/// are ignored.
pub fn default_lru_size() -> usize {
    std::env::var("TILESTACK_LRU_FRAMES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or(DEFAULT_LRU_SIZE)
}

/// Shared, single-threaded handle to a stack. Derived stacks hold these for their inputs.
pub type SharedTilestack = Rc<RefCell<dyn Tilestack>>;

/// Wrap a concrete stack into a [`SharedTilestack`].
pub fn share<T: Tilestack + 'static>(ts: T) -> SharedTilestack {
    Rc::new(RefCell::new(ts))
}

/// A sequence of equally-sized pixel frames.
pub trait Tilestack {
    /// Geometry and encoding of this stack.
    fn info(&self) -> TilestackInfo;

    /// Capture time of `frame` in seconds.
    fn frame_timestamp(&self, frame: usize) -> TilestackResult<f64>;

    /// Pixels of `frame`, materializing them on first access.
    fn frame_pixels(&mut self, frame: usize) -> TilestackResult<&[u8]>;

    /// Whether `frame` is currently materialized.
    fn is_resident(&self, frame: usize) -> bool;

    /// Number of frame buffers currently held.
    fn resident_count(&self) -> usize;

    /// This stack as a [`resident::ResidentTilestack`], if that is what it is.
    fn as_resident_mut(&mut self) -> Option<&mut resident::ResidentTilestack> {
        None
    }

    /// Bytes of the pixel at `(x, y)` in `frame`.
    fn frame_pixel(&mut self, frame: usize, x: u32, y: u32) -> TilestackResult<&[u8]> {
        let info = self.info();
        if x >= info.tile_width || y >= info.tile_height {
            return Err(TilestackError::geometry(format!(
                "pixel ({x}, {y}) outside {}x{} tile",
                info.tile_width, info.tile_height
            )));
        }
        let bpp = info.bytes_per_pixel();
        let off = bpp * (x as usize + y as usize * info.tile_width as usize);
        let pixels = self.frame_pixels(frame)?;
        Ok(&pixels[off..off + bpp])
    }
}

/// Hook implemented by every stack whose frames live in an [`LruFrames`] window.
///
/// A blanket impl turns these into [`Tilestack`]s.
pub trait LazyTilestack {
    fn frames(&self) -> &LruFrames;
    fn frames_mut(&mut self) -> &mut LruFrames;

    /// Fill `dest` (exactly `bytes_per_frame` long) with the pixels of `frame`.
    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()>;
}

impl<T: LazyTilestack> Tilestack for T {
    fn info(&self) -> TilestackInfo {
        self.frames().info
    }

    fn frame_timestamp(&self, frame: usize) -> TilestackResult<f64> {
        self.frames().timestamp(frame)
    }

    fn frame_pixels(&mut self, frame: usize) -> TilestackResult<&[u8]> {
        self.frames().check_frame(frame)?;
        if !self.frames().is_resident(frame) {
            let mut buf = self.frames_mut().create(frame);
            if let Err(e) = self.instantiate_pixels(frame, &mut buf) {
                self.frames_mut().abandon(frame);
                return Err(e);
            }
            self.frames_mut().insert(frame, buf);
        }
        self.frames().pixels(frame)
    }

    fn is_resident(&self, frame: usize) -> bool {
        self.frames().is_resident(frame)
    }

    fn resident_count(&self) -> usize {
        self.frames().resident_count()
    }
}

/// Per-stack frame slots with a creation-order eviction window.
///
/// Creating a frame when more than `lru_size` are resident drops the *oldest created* one,
/// not the least recently read; reads are not tracked. At most `lru_size + 1` buffers are
/// held at any time.
#[derive(Debug)]
pub struct LruFrames {
    pub info: TilestackInfo,
    pub toc: Vec<TocEntry>,
    pixels: Vec<Option<Vec<u8>>>,
    created: VecDeque<usize>,
    lru_size: usize,
}

impl LruFrames {
    pub fn new(info: TilestackInfo, lru_size: usize) -> Self {
        Self {
            info,
            toc: vec![TocEntry::default(); info.nframes],
            pixels: vec![None; info.nframes],
            created: VecDeque::new(),
            lru_size,
        }
    }

    /// Use the timestamps of `toc` (which must have one entry per frame).
    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        debug_assert_eq!(toc.len(), self.info.nframes);
        self.toc = toc;
        self
    }

    pub fn with_timestamps(mut self, timestamps: impl IntoIterator<Item = f64>) -> Self {
        for (entry, ts) in self.toc.iter_mut().zip(timestamps) {
            entry.timestamp = ts;
        }
        self
    }

    pub fn lru_size(&self) -> usize {
        self.lru_size
    }

    pub fn check_frame(&self, frame: usize) -> TilestackResult<()> {
        if frame >= self.info.nframes {
            return Err(TilestackError::geometry(format!(
                "frame {frame} requested from a stack of {} frames",
                self.info.nframes
            )));
        }
        Ok(())
    }

    pub fn timestamp(&self, frame: usize) -> TilestackResult<f64> {
        self.check_frame(frame)?;
        Ok(self.toc[frame].timestamp)
    }

    pub fn is_resident(&self, frame: usize) -> bool {
        self.pixels.get(frame).is_some_and(Option::is_some)
    }

    pub fn resident_count(&self) -> usize {
        self.created.len()
    }

    /// Evict down to the window and hand back a zeroed buffer for `frame`.
    fn create(&mut self, frame: usize) -> Vec<u8> {
        let mut recycled = None;
        while self.created.len() > self.lru_size {
            if let Some(old) = self.created.pop_back() {
                recycled = self.pixels[old].take();
            }
        }
        self.created.push_front(frame);

        let bytes = self.info.bytes_per_frame();
        let mut buf = recycled.unwrap_or_default();
        buf.clear();
        buf.resize(bytes, 0);
        buf
    }

    fn abandon(&mut self, frame: usize) {
        if self.created.front() == Some(&frame) {
            self.created.pop_front();
        }
    }

    fn insert(&mut self, frame: usize, buf: Vec<u8>) {
        self.pixels[frame] = Some(buf);
    }

    fn pixels(&self, frame: usize) -> TilestackResult<&[u8]> {
        self.pixels
            .get(frame)
            .and_then(|p| p.as_deref())
            .ok_or_else(|| TilestackError::geometry(format!("frame {frame} is not resident")))
    }
}

/// Copy `frame` out of a shared stack, releasing the borrow before returning.
///
/// Operators use this so the same upstream handle can feed several inputs at once.
pub fn copy_frame(src: &SharedTilestack, frame: usize) -> TilestackResult<Vec<u8>> {
    Ok(src.borrow_mut().frame_pixels(frame)?.to_vec())
}

/// Copy of `src`'s timestamps, one per frame.
pub fn timestamps_of(src: &SharedTilestack) -> TilestackResult<Vec<f64>> {
    let src = src.borrow();
    (0..src.info().nframes)
        .map(|i| src.frame_timestamp(i))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/stack/lru.rs"]
mod tests;
