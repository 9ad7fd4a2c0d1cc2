use crate::{
    format::pixel::{CompressionFormat, TilestackInfo},
    foundation::{
        core::Frame,
        error::{TilestackError, TilestackResult},
    },
    pyramid::{
        projection::{ProjectionParams, ProjectionWindow, render_projection},
        render::{Image, render_image},
        stackset::PixelSource,
    },
    stack::{LazyTilestack, LruFrames, default_lru_size},
};

/// How each path frame is resolved against the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RenderMode {
    /// Viewport rectangle resampled from the best mip level.
    Planar { downsize: bool },
    /// Dome reprojection of an equirectangular panorama.
    Projected {
        params: ProjectionParams,
        window: ProjectionWindow,
    },
}

/// A tilestack whose frame `i` is `path[i]` rendered from a pyramid, on demand.
pub struct PathTilestack {
    source: Box<dyn PixelSource>,
    path: Vec<Frame>,
    mode: RenderMode,
    frames: LruFrames,
}

impl PathTilestack {
    pub fn new(
        mut source: Box<dyn PixelSource>,
        width: u32,
        height: u32,
        path: Vec<Frame>,
        mode: RenderMode,
    ) -> TilestackResult<Self> {
        if width == 0 || height == 0 {
            return Err(TilestackError::usage("path stack width and height must be positive"));
        }
        if let RenderMode::Projected { params, .. } = &mode {
            params.validate()?;
        }
        let nframes = source.nframes();
        let mut timestamps = Vec::with_capacity(path.len());
        for (i, frame) in path.iter().enumerate() {
            if frame.frameno < 0 || frame.frameno as usize >= nframes {
                return Err(TilestackError::geometry(format!(
                    "path frame {i} asks for source frame {} of {nframes}",
                    frame.frameno
                )));
            }
            timestamps.push(source.frame_timestamp(frame.frameno as usize)?);
        }

        let info = TilestackInfo {
            pixel: source.pixel_info(),
            nframes: path.len(),
            tile_width: width,
            tile_height: height,
            compression_format: CompressionFormat::None,
        };
        tracing::debug!(nframes = path.len(), width, height, ?mode, "path stack");
        Ok(Self {
            source,
            path,
            mode,
            frames: LruFrames::new(info, default_lru_size()).with_timestamps(timestamps),
        })
    }

    pub fn path(&self) -> &[Frame] {
        &self.path
    }
}

impl LazyTilestack for PathTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let info = self.frames.info;
        let f = self.path[frame];
        let mut image = Image::new(info.pixel, info.tile_width, info.tile_height, dest)?;
        match &self.mode {
            RenderMode::Planar { downsize } => {
                render_image(self.source.as_mut(), &mut image, &f, *downsize)
            }
            RenderMode::Projected { params, window } => {
                render_projection(self.source.as_mut(), &mut image, &f, params, window)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pyramid/path_stack.rs"]
mod tests;
