use super::*;
use crate::stack::{Tilestack, share};

fn save_rgb(path: &Path, width: u32, height: u32, seed: u8) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([seed.wrapping_add(x as u8), y as u8 * 10, 7])
    });
    img.save(path).unwrap();
}

#[test]
fn tiles_load_as_frames() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    save_rgb(&a, 3, 2, 0);
    save_rgb(&b, 3, 2, 100);
    let mut ts = load_tiles(&[&a, &b]).unwrap();
    let info = ts.info();
    assert_eq!((info.nframes, info.tile_width, info.tile_height), (2, 3, 2));
    assert_eq!(info.pixel, PixelInfo::new(3, 8, PixelFormat::Integer).unwrap());
    assert_eq!(ts.frame_pixel(1, 2, 1).unwrap(), &[102, 10, 7]);
    assert_eq!(ts.frame_timestamp(1).unwrap(), 0.0);
}

#[test]
fn tiles_must_share_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.png");
    let b = dir.path().join("b.png");
    save_rgb(&a, 3, 2, 0);
    save_rgb(&b, 2, 2, 0);
    assert!(matches!(load_tiles(&[&a, &b]), Err(TilestackError::Geometry(_))));
}

#[test]
fn missing_tile_is_a_resource_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.png");
    assert!(matches!(load_tiles(&[&missing]), Err(TilestackError::Resource(_))));
}

#[test]
fn sixteen_bit_images_keep_their_depth() {
    let img = image::ImageBuffer::<image::Luma<u16>, _>::from_raw(2, 1, vec![1000u16, 65535]).unwrap();
    let tile = ImageTile::from_dynamic(DynamicImage::ImageLuma16(img));
    assert_eq!(tile.pixel.bits_per_band, 16);
    assert_eq!(tile.pixel.get_band(&tile.pixels[0..2], 0).unwrap(), 1000.0);
    assert_eq!(tile.pixel.get_band(&tile.pixels[2..4], 0).unwrap(), 65535.0);
}

#[test]
fn raw_frames_split_by_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.bin");
    let samples: Vec<u8> = [1.5f32, 2.5, 3.5, 4.5].iter().flat_map(|v| v.to_le_bytes()).collect();
    std::fs::write(&path, &samples).unwrap();
    let mut ts = load_raw(&path, 2, 1, "f32", 1).unwrap();
    assert_eq!(ts.info().nframes, 2);
    let px = ts.frame_pixel(1, 1, 0).unwrap().to_vec();
    assert_eq!(ts.info().pixel.get_band(&px, 0).unwrap(), 4.5);

    assert!(matches!(load_raw(&path, 3, 1, "f32", 1), Err(TilestackError::Format(_))));
    assert!(matches!(load_raw(&path, 2, 1, "i7", 1), Err(TilestackError::Usage(_))));
}

#[test]
fn html_index_lists_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let info = TilestackInfo {
        pixel: PixelInfo::new(1, 8, PixelFormat::Integer).unwrap(),
        nframes: 2,
        tile_width: 2,
        tile_height: 2,
        compression_format: CompressionFormat::None,
    };
    let src = share(ResidentTilestack::from_pixels(info, (0..8).collect()).unwrap());
    let html = write_html(&src, &dir.path().join("page.html")).unwrap();
    assert_eq!(html, dir.path().join("page.html"));
    let text = std::fs::read_to_string(&html).unwrap();
    assert!(text.contains("<div><img src=\"page/0000.png\"><br>0000</div>"));
    assert!(text.contains("<div><img src=\"page/0001.png\"><br>0001</div>"));
    let png = image::open(dir.path().join("page/0001.png")).unwrap().into_luma8();
    assert_eq!(png.into_raw(), vec![4, 5, 6, 7]);
}

#[test]
fn float_frames_cannot_be_png() {
    let pixel = PixelInfo::new(1, 32, PixelFormat::Float).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = write_image(&dir.path().join("x.png"), ImageFormat::Png, 1, 1, pixel, &[0; 4]);
    assert!(matches!(err, Err(TilestackError::Format(_))));
}

#[test]
fn image_is_cut_into_finest_level_tiles() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src.png");
    save_rgb(&src, 5, 3, 0);
    let dest = dir.path().join("tiles");
    image2tiles(&dest, "png", &src, 4).unwrap();

    let dims: StacksetDims =
        serde_json::from_str(&std::fs::read_to_string(dest.join("r.json")).unwrap()).unwrap();
    assert_eq!(dims, StacksetDims { width: 5, height: 3, tile_width: 4, tile_height: 4 });

    let right = image::open(dest.join("r1.png")).unwrap().into_rgb8();
    assert_eq!(right.dimensions(), (4, 4));
    assert_eq!(right.get_pixel(0, 2).0, [4, 20, 7]);
    assert_eq!(right.get_pixel(1, 0).0, [0, 0, 0]);
    assert_eq!(right.get_pixel(0, 3).0, [0, 0, 0]);
    assert!(dest.join("r0.png").is_file());

    // a second run leaves the existing stackset alone
    std::fs::remove_file(dest.join("r0.png")).unwrap();
    image2tiles(&dest, "png", &src, 4).unwrap();
    assert!(!dest.join("r0.png").exists());
}
