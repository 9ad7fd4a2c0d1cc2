use super::*;
use crate::{
    foundation::error::TilestackError,
    format::pixel::{CompressionFormat, PixelFormat, PixelInfo, TilestackInfo},
    stack::{Tilestack, resident::ResidentTilestack, share},
};

fn stack(bands: u32, width: u32, pixels: &[u8]) -> SharedTilestack {
    let info = TilestackInfo {
        pixel: PixelInfo::new(bands, 8, PixelFormat::Integer).unwrap(),
        nframes: 1,
        tile_width: width,
        tile_height: 1,
        compression_format: CompressionFormat::None,
    };
    share(ResidentTilestack::from_pixels(info, pixels.to_vec()).unwrap())
}

#[test]
fn add_and_subtract_clamp_to_the_integer_range() {
    let a = stack(1, 3, &[10, 200, 5]);
    let b = stack(1, 3, &[1, 100, 9]);
    let mut sum = BinopTilestack::new(a.clone(), b.clone(), BinaryOp::Add).unwrap();
    assert_eq!(sum.frame_pixels(0).unwrap(), &[11, 255, 14]);
    let mut diff = BinopTilestack::new(a, b, BinaryOp::Subtract).unwrap();
    assert_eq!(diff.frame_pixels(0).unwrap(), &[9, 100, 0]);
}

#[test]
fn band_mismatch_is_described() {
    let err = BinopTilestack::new(stack(1, 2, &[0, 0]), stack(2, 1, &[0, 0]), BinaryOp::Add)
        .err()
        .unwrap();
    assert!(matches!(err, TilestackError::Geometry(_)));
    assert!(err.to_string().contains("add"));

    let err = BinopTilestack::new(stack(1, 2, &[0, 0]), stack(1, 1, &[0]), BinaryOp::Subtract)
        .err()
        .unwrap();
    assert!(err.to_string().contains("tile sizes differ"));
}

#[test]
fn scale_multiplies_every_band() {
    let mut out = UnopTilestack::new(stack(2, 1, &[3, 100]), UnaryOp::Scale(2.5)).unwrap();
    assert_eq!(out.frame_pixels(0).unwrap(), &[8, 250]);
}
