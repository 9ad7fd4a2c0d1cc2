use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::{
    format::pixel::{PixelInfo, TilestackInfo},
    foundation::error::{TilestackError, TilestackResult},
    pyramid::tile_address::TileAddress,
    stack::{SharedTilestack, Tilestack, reader::TilestackReader},
};

/// Something the renderer can sample pixels from, addressed per mip level.
pub trait PixelSource {
    /// Layout of every pixel `get_pixel` writes.
    fn pixel_info(&self) -> PixelInfo;

    /// Number of mip levels; level `nlevels - 1` is full resolution.
    fn nlevels(&self) -> i32;

    /// Frames available in each underlying tilestack.
    fn nframes(&self) -> usize;

    fn frame_timestamp(&mut self, frame: usize) -> TilestackResult<f64>;

    /// Copy the pixel at `(x, y)` of `level` into `dest`, or zeros where there is no data.
    fn get_pixel(
        &mut self,
        dest: &mut [u8],
        frame: usize,
        level: i32,
        x: i64,
        y: i64,
    ) -> TilestackResult<()>;
}

/// Contents of a stackset's `r.json`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StacksetDims {
    pub width: u32,
    pub height: u32,
    pub tile_width: u32,
    pub tile_height: u32,
}

/// Levels needed so that the coarsest one is a single tile covering the image.
pub fn compute_tile_nlevels(width: u32, height: u32, tile_width: u32, tile_height: u32) -> i32 {
    let mut max_level = 0;
    while u64::from(width) > u64::from(tile_width) << max_level
        || u64::from(height) > u64::from(tile_height) << max_level
    {
        max_level += 1;
    }
    max_level + 1
}

/// A tile pyramid on disk: `root/r.json` plus one `.ts2` per quadtree node.
pub struct Stackset {
    root: PathBuf,
    dims: StacksetDims,
    nlevels: i32,
    info: TilestackInfo,
    /// Opened tiles by packed address; `None` records a tile known to be absent.
    readers: HashMap<u64, Option<TilestackReader>>,
}

impl Stackset {
    #[tracing::instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> TilestackResult<Self> {
        let root = root.as_ref().to_path_buf();
        let json_path = root.join("r.json");
        let json = std::fs::read_to_string(&json_path).map_err(|e| {
            TilestackError::resource(format!("can't open {} for reading: {e}", json_path.display()))
        })?;
        let dims: StacksetDims = serde_json::from_str(&json).map_err(|e| {
            TilestackError::serde(format!("can't parse {}: {e}", json_path.display()))
        })?;
        if dims.tile_width == 0 || dims.tile_height == 0 {
            return Err(TilestackError::geometry(format!(
                "{}: tile size must be positive",
                json_path.display()
            )));
        }
        let nlevels = compute_tile_nlevels(dims.width, dims.height, dims.tile_width, dims.tile_height);

        let origin = TileAddress::new(nlevels - 1, 0, 0);
        let origin_path = root.join(format!("{}.ts2", origin.path()?));
        let reader = TilestackReader::open(&origin_path).map_err(|e| {
            TilestackError::resource(format!(
                "initializing stackset but couldn't find tilestack at path {}: {e}",
                origin_path.display()
            ))
        })?;
        let info = reader.info();
        if info.tile_width != dims.tile_width || info.tile_height != dims.tile_height {
            return Err(TilestackError::geometry(format!(
                "r.json says {}x{} tiles but {} is {}x{}",
                dims.tile_width,
                dims.tile_height,
                origin_path.display(),
                info.tile_width,
                info.tile_height
            )));
        }

        let mut readers = HashMap::new();
        readers.insert(origin.key(), Some(reader));
        tracing::debug!(nlevels, ?dims, "opened stackset");
        Ok(Self {
            root,
            dims,
            nlevels,
            info,
            readers,
        })
    }

    pub fn dims(&self) -> StacksetDims {
        self.dims
    }

    pub fn info(&self) -> TilestackInfo {
        self.info
    }

    /// Where tile `addr` lives; addresses outside the quadtree map to the root directory.
    pub fn tile_path(&self, addr: TileAddress) -> PathBuf {
        match addr.path() {
            Ok(rel) => self.root.join(format!("{rel}.ts2")),
            Err(_) => self.root.clone(),
        }
    }

    /// The reader for `addr`, opening it on first use.
    ///
    /// Failures to open are remembered, so a missing tile costs one filesystem probe. A tile
    /// whose size or pixel layout differs from the stackset's counts as missing.
    pub fn get_tilestack(&mut self, addr: TileAddress) -> Option<&mut TilestackReader> {
        let key = addr.key();
        if !self.readers.contains_key(&key) {
            let opened = if addr.is_valid() {
                let path = self.tile_path(addr);
                match TilestackReader::open(&path) {
                    Ok(reader) if reader.info().same_frame_geometry(&self.info) => Some(reader),
                    Ok(reader) => {
                        let info = reader.info();
                        tracing::warn!(
                            path = %path.display(),
                            width = info.tile_width,
                            height = info.tile_height,
                            pixel = ?info.pixel,
                            "tile layout differs from the stackset, treating it as absent"
                        );
                        None
                    }
                    Err(err) => {
                        tracing::debug!(%addr, %err, "tile absent");
                        None
                    }
                }
            } else {
                None
            };
            self.readers.insert(key, opened);
        }
        self.readers.get_mut(&key).and_then(Option::as_mut)
    }
}

impl PixelSource for Stackset {
    fn pixel_info(&self) -> PixelInfo {
        self.info.pixel
    }

    fn nlevels(&self) -> i32 {
        self.nlevels
    }

    fn nframes(&self) -> usize {
        self.info.nframes
    }

    fn frame_timestamp(&mut self, frame: usize) -> TilestackResult<f64> {
        let origin = TileAddress::new(self.nlevels - 1, 0, 0);
        match self.get_tilestack(origin) {
            Some(reader) => reader.frame_timestamp(frame),
            None => Ok(0.0),
        }
    }

    fn get_pixel(
        &mut self,
        dest: &mut [u8],
        frame: usize,
        level: i32,
        x: i64,
        y: i64,
    ) -> TilestackResult<()> {
        if x >= 0 && y >= 0 {
            let tw = i64::from(self.dims.tile_width);
            let th = i64::from(self.dims.tile_height);
            let addr = TileAddress::new(level, x / tw, y / th);
            if let Some(reader) = self.get_tilestack(addr) {
                let px = reader.frame_pixel(frame, (x % tw) as u32, (y % th) as u32)?;
                dest.copy_from_slice(px);
                return Ok(());
            }
        }
        dest.fill(0);
        Ok(())
    }
}

/// A lone tilestack viewed as a one-level, one-tile pyramid.
pub struct SingleStackSource {
    stack: SharedTilestack,
    info: TilestackInfo,
}

impl SingleStackSource {
    pub fn new(stack: SharedTilestack) -> Self {
        let info = stack.borrow().info();
        Self { stack, info }
    }
}

impl PixelSource for SingleStackSource {
    fn pixel_info(&self) -> PixelInfo {
        self.info.pixel
    }

    fn nlevels(&self) -> i32 {
        1
    }

    fn nframes(&self) -> usize {
        self.info.nframes
    }

    fn frame_timestamp(&mut self, frame: usize) -> TilestackResult<f64> {
        self.stack.borrow().frame_timestamp(frame)
    }

    fn get_pixel(
        &mut self,
        dest: &mut [u8],
        frame: usize,
        _level: i32,
        x: i64,
        y: i64,
    ) -> TilestackResult<()> {
        if (0..i64::from(self.info.tile_width)).contains(&x)
            && (0..i64::from(self.info.tile_height)).contains(&y)
        {
            let mut stack = self.stack.borrow_mut();
            dest.copy_from_slice(stack.frame_pixel(frame, x as u32, y as u32)?);
        } else {
            dest.fill(0);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pyramid/stackset.rs"]
mod tests;
