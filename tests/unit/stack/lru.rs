use super::*;
use crate::format::pixel::{CompressionFormat, PixelFormat, PixelInfo};

struct Counting {
    frames: LruFrames,
    instantiated: Vec<usize>,
}

impl Counting {
    fn new(nframes: usize, lru_size: usize) -> Self {
        let info = TilestackInfo {
            pixel: PixelInfo::new(1, 8, PixelFormat::Integer).unwrap(),
            nframes,
            tile_width: 2,
            tile_height: 2,
            compression_format: CompressionFormat::None,
        };
        Self {
            frames: LruFrames::new(info, lru_size),
            instantiated: Vec::new(),
        }
    }
}

impl LazyTilestack for Counting {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        self.instantiated.push(frame);
        dest.fill(frame as u8);
        Ok(())
    }
}

#[test]
fn window_keeps_lru_size_plus_one_most_recent_creations() {
    let mut ts = Counting::new(10, 5);
    for f in 0..10 {
        assert_eq!(ts.frame_pixels(f).unwrap(), &[f as u8; 4]);
    }
    assert_eq!(ts.resident_count(), 6);
    let resident: Vec<usize> = (0..10).filter(|&f| ts.is_resident(f)).collect();
    assert_eq!(resident, vec![4, 5, 6, 7, 8, 9]);
}

#[test]
fn eviction_follows_creation_order_not_access() {
    let mut ts = Counting::new(4, 1);
    ts.frame_pixels(0).unwrap();
    ts.frame_pixels(1).unwrap();
    // Reading frame 0 again does not refresh it.
    ts.frame_pixels(0).unwrap();
    ts.frame_pixels(2).unwrap();
    assert!(!ts.is_resident(0));
    assert!(ts.is_resident(1));
    assert!(ts.is_resident(2));
    assert_eq!(ts.instantiated, vec![0, 1, 2]);
}

#[test]
fn cached_frames_are_not_recomputed() {
    let mut ts = Counting::new(3, 5);
    ts.frame_pixels(1).unwrap();
    ts.frame_pixels(1).unwrap();
    assert_eq!(ts.instantiated, vec![1]);
}

#[test]
fn out_of_range_frame_is_geometry_error() {
    let mut ts = Counting::new(3, 5);
    assert!(matches!(
        ts.frame_pixels(3),
        Err(TilestackError::Geometry(_))
    ));
    assert!(ts.frame_timestamp(7).is_err());
}

#[test]
fn frame_pixel_indexes_row_major() {
    let mut ts = Counting::new(1, 5);
    assert_eq!(ts.frame_pixel(0, 1, 1).unwrap(), &[0u8]);
    assert!(ts.frame_pixel(0, 2, 0).is_err());
}

#[test]
fn shared_handles_release_borrows_between_copies() {
    let shared: SharedTilestack = share(Counting::new(2, 5));
    let a = copy_frame(&shared, 0).unwrap();
    let b = copy_frame(&shared, 1).unwrap();
    assert_eq!(a, vec![0; 4]);
    assert_eq!(b, vec![1; 4]);
    assert_eq!(timestamps_of(&shared).unwrap(), vec![0.0, 0.0]);
}
