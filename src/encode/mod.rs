//! Video output through an external encoder.

use std::path::Path;

use crate::{
    format::pixel::TilestackInfo,
    foundation::error::{TilestackError, TilestackResult},
    io::fs::{ensure_parent_dir, publish, temporary_path},
    stack::SharedTilestack,
};

pub mod ffmpeg;

use ffmpeg::{FfmpegEncoder, VideoCodec, VideoConfig, VideoEncoder};

/// Convert one frame to interleaved rgb24 from its first three bands, clamped to `0..=255`.
pub fn frame_to_rgb24(info: &TilestackInfo, pixels: &[u8], out: &mut [u8]) -> TilestackResult<()> {
    if info.pixel.bands_per_pixel < 3 {
        return Err(TilestackError::geometry(format!(
            "video needs at least 3 bands, stack has {}",
            info.pixel.bands_per_pixel
        )));
    }
    let bpp = info.bytes_per_pixel();
    for (src, dst) in pixels.chunks_exact(bpp).zip(out.chunks_exact_mut(3)) {
        for (band, d) in dst.iter_mut().enumerate() {
            *d = info.pixel.get_band(src, band)?.clamp(0.0, 255.0) as u8;
        }
    }
    Ok(())
}

/// Encode every frame of `src` into `dest` with `encoder`.
pub fn encode_frames(src: &SharedTilestack, encoder: &mut dyn VideoEncoder) -> TilestackResult<()> {
    let info = src.borrow().info();
    let mut rgb = vec![0u8; info.tile_width as usize * info.tile_height as usize * 3];
    for frame in 0..info.nframes {
        let mut stack = src.borrow_mut();
        frame_to_rgb24(&info, stack.frame_pixels(frame)?, &mut rgb)?;
        drop(stack);
        encoder.write_pixels(&rgb)?;
    }
    encoder.close()
}

/// Encode `src` to `dest`, choosing the codec from the extension.
#[tracing::instrument(skip(src))]
pub fn write_video(
    src: &SharedTilestack,
    dest: &Path,
    fps: f64,
    compression: f64,
    create_parents: bool,
) -> TilestackResult<()> {
    let info = src.borrow().info();
    if info.nframes == 0 {
        return Err(TilestackError::geometry("tilestack has no frames in write_video"));
    }
    let config = VideoConfig {
        width: info.tile_width,
        height: info.tile_height,
        fps,
        compression,
        codec: VideoCodec::from_path(dest)?,
    };
    if create_parents {
        ensure_parent_dir(dest)?;
    }
    let temp = temporary_path(dest);
    tracing::info!(temp = %temp.display(), "encoding video");
    let mut encoder = FfmpegEncoder::new(&temp, config)?;
    if let Err(e) = encode_frames(src, &mut encoder) {
        let _ = encoder.close();
        let _ = std::fs::remove_file(&temp);
        return Err(e);
    }
    tracing::info!(from = %temp.display(), to = %dest.display(), "renaming");
    publish(&temp, dest)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/video.rs"]
mod tests;
