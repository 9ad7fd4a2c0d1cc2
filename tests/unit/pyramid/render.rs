use super::*;
use crate::format::pixel::PixelFormat;

/// Synthetic pyramid: each level is `8 << level` pixels square, pixel value `x + 10 * y + 100 * level`.
struct Ramp {
    nlevels: i32,
    calls: usize,
}

impl PixelSource for Ramp {
    fn pixel_info(&self) -> PixelInfo {
        PixelInfo::new(1, 16, PixelFormat::Integer).unwrap()
    }

    fn nlevels(&self) -> i32 {
        self.nlevels
    }

    fn nframes(&self) -> usize {
        1
    }

    fn frame_timestamp(&mut self, _frame: usize) -> TilestackResult<f64> {
        Ok(0.0)
    }

    fn get_pixel(
        &mut self,
        dest: &mut [u8],
        _frame: usize,
        level: i32,
        x: i64,
        y: i64,
    ) -> TilestackResult<()> {
        self.calls += 1;
        let size = 8i64 << level;
        let v = if (0..size).contains(&x) && (0..size).contains(&y) {
            (x + 10 * y + 100 * i64::from(level)) as f64
        } else {
            0.0
        };
        self.pixel_info().set_band(dest, 0, v)
    }
}

fn render(src: &mut Ramp, w: u32, h: u32, bounds: Bbox) -> Vec<f64> {
    let pixel = src.pixel_info();
    let mut buf = vec![0u8; pixel.bytes_per_pixel() * (w * h) as usize];
    let mut img = Image::new(pixel, w, h, &mut buf).unwrap();
    render_image(src, &mut img, &Frame::new(0, bounds), false).unwrap();
    let mut out = Vec::new();
    pixel.decode_into(&buf, &mut out).unwrap();
    out
}

#[test]
fn level_selection_is_monotonic_and_clamped() {
    let nlevels = 6;
    let mut prev = select_source_level(nlevels, 1000.0, 100.0, false);
    assert_eq!(prev, nlevels - 1);
    let mut dest_width = 1000.0;
    for _ in 0..20 {
        dest_width /= 2.0;
        let level = select_source_level(nlevels, dest_width, 100.0, false);
        assert!(level <= prev && prev - level <= 1, "{prev} -> {level}");
        assert!((0..nlevels).contains(&level));
        prev = level;
    }
    assert_eq!(prev, 0);
}

#[test]
fn downsize_never_picks_a_coarser_level() {
    for dest_width in [10.0, 33.0, 64.0, 100.0, 250.0] {
        let plain = select_source_level(5, dest_width, 256.0, false);
        let downsized = select_source_level(5, dest_width, 256.0, true);
        assert!(downsized >= plain);
    }
}

#[test]
fn bilinear_sampling_at_centers_and_midpoints() {
    let mut src = Ramp { nlevels: 1, calls: 0 };
    let pixel = src.pixel_info();
    let mut px = vec![0u8; 2];
    interpolate_pixel(&mut src, &mut px, 0, 0, 2.5, 3.5).unwrap();
    assert_eq!(pixel.get_band(&px, 0).unwrap(), 32.0);
    interpolate_pixel(&mut src, &mut px, 0, 0, 3.0, 3.5).unwrap();
    assert_eq!(pixel.get_band(&px, 0).unwrap(), 33.0); // (32 + 33) / 2 rounded
    // Half of the footprint falls left of the image.
    interpolate_pixel(&mut src, &mut px, 0, 0, 0.0, 1.5).unwrap();
    assert_eq!(pixel.get_band(&px, 0).unwrap(), 5.0);
}

#[test]
fn fast_path_copies_integral_windows() {
    let mut src = Ramp { nlevels: 1, calls: 0 };
    let out = render(&mut src, 2, 2, Bbox::new(3.0, 1.0, 2.0, 2.0));
    assert_eq!(out, vec![13.0, 14.0, 23.0, 24.0]);
    // One fetch per output pixel, not four.
    assert_eq!(src.calls, 4);
}

#[test]
fn downsampling_from_the_finest_level_averages_blocks() {
    let mut src = Ramp { nlevels: 2, calls: 0 };
    // Half scale still rounds up to the finest level.
    let out = render(&mut src, 4, 4, Bbox::new(0.0, 0.0, 8.0, 8.0));
    assert!(src.calls > 16);
    // (100 + 101 + 110 + 111) / 4 = 105.5
    assert_eq!(out[0], 106.0);
}

#[test]
fn coarse_levels_get_scaled_bounds() {
    let mut src = Ramp { nlevels: 3, calls: 0 };
    // 2 output pixels spanning 32 source pixels: level 0, bounds shrink to 8x4.
    let out = render(&mut src, 2, 1, Bbox::new(0.0, 0.0, 32.0, 16.0));
    assert_eq!(out, vec![17.0, 21.0]);
}
