use std::io::Cursor;

use super::*;
use crate::stack::resident::ResidentTilestack;

fn info(nframes: usize) -> TilestackInfo {
    TilestackInfo {
        pixel: PixelInfo::new(3, 8, PixelFormat::Integer).unwrap(),
        nframes,
        tile_width: 4,
        tile_height: 2,
        compression_format: CompressionFormat::None,
    }
}

fn sample_file(compression: CompressionFormat) -> Vec<u8> {
    let mut ts = ResidentTilestack::new(info(2)).unwrap();
    for (i, b) in ts.frame_pixels_mut(1).unwrap().iter_mut().enumerate() {
        *b = i as u8;
    }
    ts.set_timestamp(0, 1.5).unwrap();
    ts.set_timestamp(1, 2.5).unwrap();
    let mut out = Vec::new();
    let n = ts.write(&mut out, compression).unwrap();
    assert_eq!(n as usize, out.len());
    out
}

#[test]
fn header_and_footer_magic_are_ascii() {
    assert_eq!(&HEADER_MAGIC.to_le_bytes(), b"tilestk2");
    assert_eq!(&FOOTER_MAGIC.to_le_bytes(), b"tstk2end");
}

#[test]
fn raw_layout_is_header_frames_toc_footer() {
    let data = sample_file(CompressionFormat::None);
    assert_eq!(&data[..8], b"tilestk2");
    assert_eq!(data.len(), 8 + 2 * 24 + 2 * 24 + 48);

    let (read_info, toc) = read_layout(&mut Cursor::new(&data)).unwrap();
    assert_eq!(read_info, info(2));
    assert_eq!(toc[0], TocEntry { timestamp: 1.5, address: 8, length: 24 });
    assert_eq!(toc[1], TocEntry { timestamp: 2.5, address: 32, length: 24 });
}

#[test]
fn zlib_frames_decode_exactly() {
    let data = sample_file(CompressionFormat::Zlib);
    let (read_info, toc) = read_layout(&mut Cursor::new(&data)).unwrap();
    assert_eq!(read_info.compression_format, CompressionFormat::Zlib);

    let e = toc[1];
    let payload = &data[e.address as usize..(e.address + e.length) as usize];
    let mut dest = vec![0u8; read_info.bytes_per_frame()];
    decode_frame(1, payload, CompressionFormat::Zlib, &mut dest).unwrap();
    assert_eq!(dest, (0..24).map(|i| i as u8).collect::<Vec<_>>());
}

#[test]
fn short_file_is_rejected() {
    let err = read_layout(&mut Cursor::new(vec![0u8; 47])).unwrap_err();
    assert!(matches!(err, TilestackError::Format(_)));
}

#[test]
fn bad_footer_magic_is_rejected() {
    let mut data = sample_file(CompressionFormat::None);
    let n = data.len();
    data[n - 1] ^= 0xff;
    let err = read_layout(&mut Cursor::new(data)).unwrap_err();
    assert!(err.to_string().contains("footer magic"));
}

#[test]
fn absurd_frame_count_is_rejected() {
    let mut footer = encode_footer(&info(1), CompressionFormat::None);
    footer[0..8].copy_from_slice(&(MAX_NFRAMES + 1).to_le_bytes());
    assert!(matches!(decode_footer(&footer), Err(TilestackError::Format(_))));
}

#[test]
fn oversized_pixel_layout_is_rejected() {
    let mut footer = encode_footer(&info(1), CompressionFormat::None);
    footer[24..28].copy_from_slice(&0x1000_0000u32.to_le_bytes());
    footer[28..32].copy_from_slice(&64u32.to_le_bytes());
    assert!(matches!(decode_footer(&footer), Err(TilestackError::Format(_))));

    footer[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
    assert!(matches!(decode_footer(&footer), Err(TilestackError::Format(_))));
}

#[test]
fn oversized_frame_is_rejected() {
    let mut footer = encode_footer(&info(1), CompressionFormat::None);
    footer[8..16].copy_from_slice(&u64::from(u32::MAX).to_le_bytes());
    footer[16..24].copy_from_slice(&u64::from(u32::MAX).to_le_bytes());
    footer[24..28].copy_from_slice(&0x0100_0000u32.to_le_bytes());
    footer[28..32].copy_from_slice(&64u32.to_le_bytes());
    assert!(matches!(decode_footer(&footer), Err(TilestackError::Format(_))));
}

#[test]
fn raw_toc_length_must_match_the_frame_size() {
    let mut data = sample_file(CompressionFormat::None);
    // Second TOC entry's length field sits 48 + 24 + 16 bytes before the end.
    let at = data.len() - 48 - 24 + 16;
    data[at..at + 8].copy_from_slice(&20u64.to_le_bytes());
    let err = read_layout(&mut Cursor::new(data)).unwrap_err();
    assert!(matches!(err, TilestackError::Format(ref m) if m.contains("frame 1")));
}

#[test]
fn unknown_compression_code_is_rejected() {
    let mut footer = encode_footer(&info(1), CompressionFormat::None);
    footer[36..40].copy_from_slice(&7u32.to_le_bytes());
    assert!(decode_footer(&footer).is_err());
}

#[test]
fn frame_length_mismatch_names_the_frame() {
    let mut dest = vec![0u8; 24];
    let err = decode_frame(3, &[0u8; 20], CompressionFormat::None, &mut dest).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("frame 3"), "{msg}");
    assert!(msg.contains("24"), "{msg}");

    let mut packed = Vec::new();
    zlib::compress(&mut packed, &[1u8; 10]).unwrap();
    let err = decode_frame(5, &packed, CompressionFormat::Zlib, &mut dest).unwrap_err();
    assert!(err.to_string().contains("frame 5"));
}

#[test]
fn toc_overlapping_footer_is_rejected() {
    let mut data = sample_file(CompressionFormat::None);
    let n = data.len();
    // Point frame 1's length past the start of the TOC.
    let len_at = n - 48 - 24 + 16;
    data[len_at..len_at + 8].copy_from_slice(&1000u64.to_le_bytes());
    assert!(read_layout(&mut Cursor::new(data)).is_err());
}
