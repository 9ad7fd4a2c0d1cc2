use serde_json::json;

use super::*;
use crate::{
    format::pixel::{CompressionFormat, PixelFormat, PixelInfo, TilestackInfo},
    stack::{Tilestack, resident::ResidentTilestack, share},
};

fn rgb_stack(values: &[u8]) -> SharedTilestack {
    let info = TilestackInfo {
        pixel: PixelInfo::new(3, 8, PixelFormat::Integer).unwrap(),
        nframes: 1,
        tile_width: (values.len() / 3) as u32,
        tile_height: 1,
        compression_format: CompressionFormat::None,
    };
    share(ResidentTilestack::from_pixels(info, values.to_vec()).unwrap())
}

#[test]
fn defaults_are_identity_on_eight_bit() {
    let band = VizBand::from_params(&json!({}), 0).unwrap();
    for v in [0.0, 1.0, 128.0, 255.0] {
        assert!((band.apply(v) - v).abs() < 1e-9);
    }
}

#[test]
fn gain_and_gamma_follow_the_tone_curve() {
    let band = VizBand::new(2.0, 2.0, 256.0).unwrap();
    // 256 * (64 * 2 / 256)^(1/2)
    assert!((band.apply(64.0) - 256.0 * 0.5f64.sqrt()).abs() < 1e-9);
    assert_eq!(band.apply(-10.0), 0.0);
}

#[test]
fn per_band_arrays_are_indexed_by_band() {
    let src = rgb_stack(&[100, 100, 100]);
    let mut viz = VizTilestack::new(src, &json!({"gain": [1, 2, 0]})).unwrap();
    assert_eq!(viz.frame_pixels(0).unwrap(), &[100, 200, 0]);
}

#[test]
fn short_parameter_array_is_rejected() {
    let src = rgb_stack(&[1, 2, 3]);
    let err = VizTilestack::new(src, &json!({"gamma": [1, 1]})).err().unwrap();
    assert!(err.to_string().contains("too few values"));
}

#[test]
fn integer_output_is_clamped() {
    let src = rgb_stack(&[200, 10, 0]);
    let mut viz = VizTilestack::new(src, &json!({"gain": 4})).unwrap();
    assert_eq!(viz.frame_pixels(0).unwrap(), &[255, 40, 0]);
}
