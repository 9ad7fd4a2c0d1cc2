use std::{
    fs::File,
    io::{BufReader, Read, Seek, SeekFrom},
    path::Path,
};

use anyhow::Context as _;

use crate::{
    format::container,
    foundation::error::{TilestackError, TilestackResult},
    stack::{LazyTilestack, LruFrames, default_lru_size},
};

/// Lazily reads frames out of a `.ts2` container.
///
/// Only the footer and TOC are read on open; each frame payload is fetched (and inflated)
/// the first time it is requested.
pub struct TilestackReader<R = BufReader<File>> {
    reader: R,
    frames: LruFrames,
    payload: Vec<u8>,
}

impl TilestackReader<BufReader<File>> {
    /// Open the container at `path`.
    pub fn open(path: impl AsRef<Path>) -> TilestackResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TilestackError::resource(format!("can't open '{}' for reading: {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
            .map_err(|e| annotate(e, path))
    }
}

fn annotate(e: TilestackError, path: &Path) -> TilestackError {
    match e {
        TilestackError::Format(msg) => {
            TilestackError::format(format!("{}: {msg}", path.display()))
        }
        other => other,
    }
}

impl<R: Read + Seek> TilestackReader<R> {
    pub fn from_reader(reader: R) -> TilestackResult<Self> {
        Self::with_lru_size(reader, default_lru_size())
    }

    pub fn with_lru_size(mut reader: R, lru_size: usize) -> TilestackResult<Self> {
        let (info, toc) = container::read_layout(&mut reader)?;
        Ok(Self {
            reader,
            frames: LruFrames::new(info, lru_size).with_toc(toc),
            payload: Vec::new(),
        })
    }
}

impl<R: Read + Seek> LazyTilestack for TilestackReader<R> {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let entry = self.frames.toc[frame];
        let len = usize::try_from(entry.length).map_err(|_| {
            TilestackError::format(format!("frame {frame} length {} is too large", entry.length))
        })?;
        self.payload.resize(len, 0);
        self.reader
            .seek(SeekFrom::Start(entry.address))
            .with_context(|| format!("seek to frame {frame}"))?;
        self.reader
            .read_exact(&mut self.payload)
            .with_context(|| format!("read frame {frame}"))?;
        container::decode_frame(
            frame,
            &self.payload,
            self.frames.info.compression_format,
            dest,
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stack/reader.rs"]
mod tests;
