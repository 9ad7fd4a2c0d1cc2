//! Resolving a viewport into pixels.
//!
//! Viewport bounds are given in full-resolution source pixels. The renderer picks the coarsest
//! mip level that still has at least one source pixel per output pixel, then either copies pixels
//! straight through or samples them bilinearly.

use crate::{
    format::pixel::PixelInfo,
    foundation::{
        core::{Bbox, Frame},
        error::{TilestackError, TilestackResult},
        math::interpolate,
    },
    pyramid::stackset::PixelSource,
};

/// Output scale at which a level is still considered sharp enough.
const LEVEL_CUTOFF: f64 = 0.999;

/// A destination raster over a borrowed pixel buffer.
pub struct Image<'a> {
    pub pixel: PixelInfo,
    pub width: u32,
    pub height: u32,
    pub pixels: &'a mut [u8],
}

impl<'a> Image<'a> {
    pub fn new(pixel: PixelInfo, width: u32, height: u32, pixels: &'a mut [u8]) -> TilestackResult<Self> {
        let expected = pixel.bytes_per_pixel() * width as usize * height as usize;
        if pixels.len() != expected {
            return Err(TilestackError::geometry(format!(
                "{width}x{height} image needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            pixel,
            width,
            height,
            pixels,
        })
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let bpp = self.pixel.bytes_per_pixel();
        let at = bpp * (x as usize + y as usize * self.width as usize);
        &mut self.pixels[at..at + bpp]
    }
}

/// Scratch space for the four neighbours of a bilinear sample.
pub struct Bilinear {
    src_pixel: PixelInfo,
    dest_pixel: PixelInfo,
    p00: Vec<u8>,
    p01: Vec<u8>,
    p10: Vec<u8>,
    p11: Vec<u8>,
}

impl Bilinear {
    /// Sampler reading `src_pixel` neighbours and writing `dest_pixel` results.
    pub fn new(src_pixel: PixelInfo, dest_pixel: PixelInfo) -> Self {
        let n = src_pixel.bytes_per_pixel();
        Self {
            src_pixel,
            dest_pixel,
            p00: vec![0; n],
            p01: vec![0; n],
            p10: vec![0; n],
            p11: vec![0; n],
        }
    }

    /// Sample `level` at continuous `(x, y)`, with pixel centers at `+0.5`.
    ///
    /// Each neighbour that falls on missing data contributes zero.
    pub fn sample<S: PixelSource + ?Sized>(
        &mut self,
        src: &mut S,
        dest: &mut [u8],
        frame: usize,
        level: i32,
        x: f64,
        y: f64,
    ) -> TilestackResult<()> {
        let x = x - 0.5;
        let y = y - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let (ix, iy) = (x0 as i64, y0 as i64);

        src.get_pixel(&mut self.p00, frame, level, ix, iy)?;
        src.get_pixel(&mut self.p01, frame, level, ix, iy + 1)?;
        src.get_pixel(&mut self.p10, frame, level, ix + 1, iy)?;
        src.get_pixel(&mut self.p11, frame, level, ix + 1, iy + 1)?;

        let pixel = self.src_pixel;
        let (fx, fy) = (x - x0, y - y0);
        for band in 0..self.dest_pixel.bands_per_pixel as usize {
            let a00 = pixel.get_band(&self.p00, band)?;
            let a01 = pixel.get_band(&self.p01, band)?;
            let a10 = pixel.get_band(&self.p10, band)?;
            let a11 = pixel.get_band(&self.p11, band)?;
            let v = a00 * (1.0 - fx) * (1.0 - fy)
                + a01 * (1.0 - fx) * fy
                + a10 * fx * (1.0 - fy)
                + a11 * fx * fy;
            self.dest_pixel.set_band(dest, band, v)?;
        }
        Ok(())
    }
}

/// One-off bilinear sample; see [`Bilinear::sample`].
pub fn interpolate_pixel<S: PixelSource + ?Sized>(
    src: &mut S,
    dest: &mut [u8],
    frame: usize,
    level: i32,
    x: f64,
    y: f64,
) -> TilestackResult<()> {
    let pixel = src.pixel_info();
    Bilinear::new(pixel, pixel).sample(src, dest, frame, level, x, y)
}

/// Mip level to sample for `dest_width` output pixels spanning `bounds_width` source pixels.
///
/// With `downsize` the cutoff is halved again.
pub fn select_source_level(nlevels: i32, dest_width: f64, bounds_width: f64, downsize: bool) -> i32 {
    let scale = dest_width / bounds_width;
    let cutoff = if downsize { LEVEL_CUTOFF / 2.0 } else { LEVEL_CUTOFF };
    let subsample_levels = (cutoff / scale).log2();
    let level = ((nlevels - 1) as f64 - subsample_levels).ceil();
    if level.is_nan() {
        return nlevels - 1;
    }
    (level.max(0.0) as i32).min(nlevels - 1)
}

/// Bounds rescaled from full resolution to `level`.
pub fn bounds_at_level(bounds: Bbox, nlevels: i32, level: i32) -> Bbox {
    if level == nlevels - 1 {
        bounds
    } else {
        bounds / (1u64 << (nlevels - 1 - level)) as f64
    }
}

fn is_integral(v: f64) -> bool {
    v.fract() == 0.0
}

/// Render `frame` into `dest`.
#[tracing::instrument(level = "trace", skip_all, fields(frameno = frame.frameno))]
pub fn render_image<S: PixelSource + ?Sized>(
    src: &mut S,
    dest: &mut Image<'_>,
    frame: &Frame,
    downsize: bool,
) -> TilestackResult<()> {
    if frame.frameno < 0 {
        return Err(TilestackError::geometry(format!("cannot render frame {}", frame.frameno)));
    }
    let frameno = frame.frameno as usize;
    let nlevels = src.nlevels();
    let level = select_source_level(nlevels, f64::from(dest.width), frame.bounds.width, downsize);
    let b = bounds_at_level(frame.bounds, nlevels, level);
    tracing::debug!(level, bounds = %b, "source level");

    let fast = b.width == f64::from(dest.width)
        && b.height == f64::from(dest.height)
        && is_integral(b.x)
        && is_integral(b.y)
        && dest.pixel == src.pixel_info();

    if fast {
        let (x0, y0) = (b.x as i64, b.y as i64);
        for y in 0..dest.height {
            for x in 0..dest.width {
                let (sx, sy) = (x0 + i64::from(x), y0 + i64::from(y));
                src.get_pixel(dest.pixel_mut(x, y), frameno, level, sx, sy)?;
            }
        }
        return Ok(());
    }

    let src_pixel = src.pixel_info();
    if src_pixel.bands_per_pixel != dest.pixel.bands_per_pixel {
        return Err(TilestackError::geometry(format!(
            "cannot render {} source bands into {} destination bands",
            src_pixel.bands_per_pixel, dest.pixel.bands_per_pixel
        )));
    }
    let mut sampler = Bilinear::new(src_pixel, dest.pixel);
    let (w, h) = (f64::from(dest.width), f64::from(dest.height));
    for y in 0..dest.height {
        let sy = interpolate(f64::from(y) + 0.5, 0.0, b.y, h, b.y + b.height);
        for x in 0..dest.width {
            let sx = interpolate(f64::from(x) + 0.5, 0.0, b.x, w, b.x + b.width);
            sampler.sample(src, dest.pixel_mut(x, y), frameno, level, sx, sy)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pyramid/render.rs"]
mod tests;
