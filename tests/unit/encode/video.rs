use super::*;
use crate::{
    format::pixel::{CompressionFormat, PixelFormat, PixelInfo},
    stack::{resident::ResidentTilestack, share},
};

fn info(bands: u32, bits: u32, format: PixelFormat, nframes: usize) -> TilestackInfo {
    TilestackInfo {
        pixel: PixelInfo::new(bands, bits, format).unwrap(),
        nframes,
        tile_width: 2,
        tile_height: 1,
        compression_format: CompressionFormat::None,
    }
}

struct Collect {
    frames: Vec<Vec<u8>>,
    closed: bool,
}

impl VideoEncoder for Collect {
    fn write_pixels(&mut self, pixels: &[u8]) -> TilestackResult<()> {
        self.frames.push(pixels.to_vec());
        Ok(())
    }

    fn close(&mut self) -> TilestackResult<()> {
        self.closed = true;
        Ok(())
    }
}

#[test]
fn rgb24_drops_alpha_and_clamps() {
    let info = info(4, 32, PixelFormat::Float, 1);
    let mut pixels = vec![0u8; info.bytes_per_frame()];
    let values = [1.0, 300.0, -4.0, 9.0, 10.5, 20.0, 30.0, 0.0];
    info.pixel.encode_from(&values, &mut pixels).unwrap();
    let mut out = [0u8; 6];
    frame_to_rgb24(&info, &pixels, &mut out).unwrap();
    assert_eq!(out, [1, 255, 0, 10, 20, 30]);
}

#[test]
fn two_band_stacks_cannot_become_video() {
    let info = info(2, 8, PixelFormat::Integer, 1);
    let mut out = [0u8; 6];
    assert!(matches!(
        frame_to_rgb24(&info, &[0; 4], &mut out),
        Err(TilestackError::Geometry(_))
    ));
}

#[test]
fn every_frame_reaches_the_encoder() {
    let info = info(3, 8, PixelFormat::Integer, 3);
    let pixels: Vec<u8> = (0..18).collect();
    let src = share(ResidentTilestack::from_pixels(info, pixels).unwrap());
    let mut enc = Collect {
        frames: Vec::new(),
        closed: false,
    };
    encode_frames(&src, &mut enc).unwrap();
    assert!(enc.closed);
    assert_eq!(enc.frames.len(), 3);
    assert_eq!(enc.frames[2], vec![12, 13, 14, 15, 16, 17]);
}

#[test]
fn empty_stack_is_rejected() {
    let src = share(ResidentTilestack::new(info(3, 8, PixelFormat::Integer, 0)).unwrap());
    let err = write_video(&src, Path::new("never.mp4"), 10.0, 28.0, false);
    assert!(matches!(err, Err(TilestackError::Geometry(_))));
}
