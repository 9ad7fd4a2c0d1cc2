//! Separable Gaussian convolution along x, y or time.
//!
//! All three work on a float32 cast of the input and produce float32 output. Near the ends of a
//! line the kernel is cut to the overlapping part and re-normalized, so edges are neither
//! darkened (zero padding) nor mirrored.

use crate::{
    format::pixel::TilestackInfo,
    foundation::error::{TilestackError, TilestackResult},
    stack::{
        LazyTilestack, LruFrames, SharedTilestack, Tilestack, default_lru_size,
        resident::ResidentTilestack, timestamps_of,
    },
};

use super::cast::{CastTilestack, to_float32};

/// Normalized Gaussian of radius `ceil(4 * sigma)`.
pub fn gaussian_kernel(sigma: f64) -> TilestackResult<Vec<f64>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(TilestackError::usage(format!("blur sigma must be > 0, got {sigma}")));
    }
    let r = (4.0 * sigma).ceil() as i64;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f64> = (-r..=r).map(|i| (-((i * i) as f64) / denom).exp()).collect();
    let sum: f64 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    Ok(kernel)
}

/// Convolve `n` samples read through `get`, writing through `put`.
///
/// Weights that would fall outside `0..n` are dropped and the rest re-normalized.
fn convolve_line(
    kernel: &[f64],
    n: usize,
    get: impl Fn(usize) -> f64,
    mut put: impl FnMut(usize, f64),
) {
    let r = (kernel.len() / 2) as i64;
    for i in 0..n as i64 {
        let lo = (i - r).max(0);
        let hi = (i + r).min(n as i64 - 1);
        let mut acc = 0.0;
        let mut weight = 0.0;
        for j in lo..=hi {
            let w = kernel[(j - i + r) as usize];
            acc += w * get(j as usize);
            weight += w;
        }
        put(i as usize, acc / weight);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Lazy per-frame blur along one spatial axis.
pub struct SpatialBlurTilestack {
    src: CastTilestack,
    axis: Axis,
    kernel: Vec<f64>,
    frames: LruFrames,
    input: Vec<f64>,
    output: Vec<f64>,
}

impl SpatialBlurTilestack {
    pub fn new(src: SharedTilestack, axis: Axis, sigma: f64) -> TilestackResult<Self> {
        let kernel = gaussian_kernel(sigma)?;
        let timestamps = timestamps_of(&src)?;
        let src = to_float32(src)?;
        Ok(Self {
            frames: LruFrames::new(src.info(), default_lru_size()).with_timestamps(timestamps),
            src,
            axis,
            kernel,
            input: Vec::new(),
            output: Vec::new(),
        })
    }
}

impl LazyTilestack for SpatialBlurTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let info = self.frames.info;
        let pixel = info.pixel;
        pixel.decode_into(self.src.frame_pixels(frame)?, &mut self.input)?;
        self.output.clear();
        self.output.resize(self.input.len(), 0.0);

        let w = info.tile_width as usize;
        let h = info.tile_height as usize;
        let nb = pixel.bands_per_pixel as usize;
        let input = &self.input;
        let output = &mut self.output;
        match self.axis {
            Axis::Horizontal => {
                for y in 0..h {
                    for band in 0..nb {
                        let at = |x: usize| (y * w + x) * nb + band;
                        convolve_line(&self.kernel, w, |x| input[at(x)], |x, v| output[at(x)] = v);
                    }
                }
            }
            Axis::Vertical => {
                for x in 0..w {
                    for band in 0..nb {
                        let at = |y: usize| (y * w + x) * nb + band;
                        convolve_line(&self.kernel, h, |y| input[at(y)], |y, v| output[at(y)] = v);
                    }
                }
            }
        }
        pixel.encode_from(&self.output, dest)
    }
}

/// Blur along the frame axis. Needs every frame at once, so the result is resident.
#[tracing::instrument(skip(src))]
pub fn temporal_blur(src: SharedTilestack, sigma: f64) -> TilestackResult<ResidentTilestack> {
    let kernel = gaussian_kernel(sigma)?;
    let timestamps = timestamps_of(&src)?;
    let mut src = to_float32(src)?;
    let info: TilestackInfo = src.info();
    let pixel = info.pixel;

    let mut frames: Vec<Vec<f64>> = Vec::with_capacity(info.nframes);
    for f in 0..info.nframes {
        let mut values = Vec::new();
        pixel.decode_into(src.frame_pixels(f)?, &mut values)?;
        frames.push(values);
    }

    let per_frame = frames.first().map_or(0, Vec::len);
    let mut out = vec![vec![0.0; per_frame]; info.nframes];
    for i in 0..per_frame {
        convolve_line(&kernel, info.nframes, |f| frames[f][i], |f, v| out[f][i] = v);
    }

    let mut resident = ResidentTilestack::new(info)?;
    for (f, values) in out.iter().enumerate() {
        pixel.encode_from(values, resident.frame_pixels_mut(f)?)?;
        resident.set_timestamp(f, timestamps[f])?;
    }
    Ok(resident)
}

#[cfg(test)]
#[path = "../../../tests/unit/stack/ops/blur.rs"]
mod tests;
