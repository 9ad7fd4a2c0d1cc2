use super::*;

const ALL_TYPES: [(u32, PixelFormat); 6] = [
    (8, PixelFormat::Integer),
    (16, PixelFormat::Integer),
    (32, PixelFormat::Integer),
    (64, PixelFormat::Integer),
    (32, PixelFormat::Float),
    (64, PixelFormat::Float),
];

#[test]
fn integer_writes_clamp_and_round() {
    let info = PixelInfo::new(1, 8, PixelFormat::Integer).unwrap();
    let mut px = [0u8; 1];
    info.set_band(&mut px, 0, -5.0).unwrap();
    assert_eq!(info.get_band(&px, 0).unwrap(), 0.0);
    info.set_band(&mut px, 0, 300.0).unwrap();
    assert_eq!(info.get_band(&px, 0).unwrap(), 255.0);
    info.set_band(&mut px, 0, 12.5).unwrap();
    assert_eq!(info.get_band(&px, 0).unwrap(), 13.0);
}

#[test]
fn every_supported_type_stores_representable_values() {
    for (bits, fmt) in ALL_TYPES {
        let info = PixelInfo::new(3, bits, fmt).unwrap();
        let mut px = vec![0u8; info.bytes_per_pixel()];
        let values = [0.0, 17.25, 200.75];
        for (b, &v) in values.iter().enumerate() {
            info.set_band(&mut px, b, v).unwrap();
        }
        for (b, &v) in values.iter().enumerate() {
            let got = info.get_band(&px, b).unwrap();
            let want = match fmt {
                PixelFormat::Integer => round_half_away(v),
                PixelFormat::Float => v,
            };
            assert_eq!(got, want, "bits={bits} fmt={fmt:?} band={b}");
        }
    }
}

#[test]
fn float_writes_are_not_clamped() {
    let info = PixelInfo::new(1, 32, PixelFormat::Float).unwrap();
    let mut px = [0u8; 4];
    info.set_band(&mut px, 0, -5.5).unwrap();
    assert_eq!(info.get_band(&px, 0).unwrap(), -5.5);
}

#[test]
fn sixteen_bit_saturates_at_its_own_max() {
    let info = PixelInfo::new(1, 16, PixelFormat::Integer).unwrap();
    let mut px = [0u8; 2];
    info.set_band(&mut px, 0, 1.0e9).unwrap();
    assert_eq!(info.get_band(&px, 0).unwrap(), 65535.0);
}

#[test]
fn unsupported_combinations_are_format_errors() {
    assert!(matches!(
        PixelInfo::new(1, 8, PixelFormat::Float),
        Err(TilestackError::Format(_))
    ));
    assert!(matches!(
        PixelInfo::new(1, 12, PixelFormat::Integer),
        Err(TilestackError::Format(_))
    ));
    assert!(PixelFormat::from_code(7).is_err());
    assert!(CompressionFormat::from_code(2).is_err());
}

#[test]
fn frame_sizes_follow_geometry() {
    let info = TilestackInfo {
        pixel: PixelInfo::new(3, 16, PixelFormat::Integer).unwrap(),
        nframes: 2,
        tile_width: 4,
        tile_height: 5,
        compression_format: CompressionFormat::None,
    };
    assert_eq!(info.bytes_per_pixel(), 6);
    assert_eq!(info.bytes_per_frame(), 120);
    assert_eq!(info.pixel.max_value(), 65535.0);
}

#[test]
fn bulk_decode_encode_matches_per_band() {
    let info = PixelInfo::new(2, 16, PixelFormat::Integer).unwrap();
    let mut buf = vec![0u8; 8];
    info.encode_from(&[1.0, 2.0, 3.0, 70000.0], &mut buf).unwrap();
    let mut vals = Vec::new();
    info.decode_into(&buf, &mut vals).unwrap();
    assert_eq!(vals, vec![1.0, 2.0, 3.0, 65535.0]);
    assert!(info.encode_from(&[1.0], &mut buf).is_err());
}

#[test]
fn huge_band_counts_are_format_errors() {
    assert!(matches!(
        PixelInfo::new(u32::MAX, 64, PixelFormat::Float),
        Err(TilestackError::Format(_))
    ));
    assert!(matches!(
        PixelInfo::new(3, 12, PixelFormat::Integer),
        Err(TilestackError::Format(_))
    ));
}
