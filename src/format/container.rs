//! The `.ts2` tilestack container.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! "tilestk2"                          8-byte header magic
//! frame payloads                      raw or zlib, concatenated, no padding
//! TOC: nframes x { f64 timestamp, u64 address, u64 length }
//! footer (48 bytes): u64 nframes, u64 tile_width, u64 tile_height,
//!                    u32 bands_per_pixel, u32 bits_per_band,
//!                    u32 pixel_format, u32 compression_format, u64 "tstk2end"
//! ```
//!
//! Readers only need the footer and TOC up front; frame payloads are fetched by address.

use std::io::{Read, Seek, SeekFrom, Write};

use anyhow::Context as _;

use crate::{
    format::pixel::{CompressionFormat, PixelFormat, PixelInfo, TilestackInfo},
    format::zlib,
    foundation::error::{TilestackError, TilestackResult},
    stack::Tilestack,
};

pub const HEADER_MAGIC: u64 = 0x326b_7473_656c_6974; // "tilestk2"
pub const FOOTER_MAGIC: u64 = 0x646e_6532_6b74_7374; // "tstk2end"
pub const HEADER_SIZE: u64 = 8;
pub const FOOTER_SIZE: u64 = 48;
pub const TOC_ENTRY_SIZE: u64 = 24;
/// Frame counts above this are treated as corruption rather than allocated.
pub const MAX_NFRAMES: u64 = 1_000_000;
/// Decoded frames larger than this are treated as corruption too.
pub const MAX_FRAME_BYTES: u64 = 1 << 32;
/// Compressed output is buffered to about this size before hitting the sink.
pub const WRITE_FLUSH_THRESHOLD: usize = 24 * 1024 * 1024;

/// Location and timestamp of one stored frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TocEntry {
    /// Capture time in seconds.
    pub timestamp: f64,
    /// Byte offset from the start of the file.
    pub address: u64,
    /// Stored (possibly compressed) byte length.
    pub length: u64,
}

fn read_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

fn read_u64(b: &[u8], at: usize) -> u64 {
    let mut a = [0u8; 8];
    a.copy_from_slice(&b[at..at + 8]);
    u64::from_le_bytes(a)
}

fn narrow_u32(v: u64, what: &str) -> TilestackResult<u32> {
    u32::try_from(v).map_err(|_| TilestackError::format(format!("{what} {v} is out of range")))
}

/// Decode and validate the 48-byte footer.
pub fn decode_footer(footer: &[u8]) -> TilestackResult<TilestackInfo> {
    if footer.len() != FOOTER_SIZE as usize {
        return Err(TilestackError::format(format!(
            "footer must be {FOOTER_SIZE} bytes, got {}",
            footer.len()
        )));
    }
    let magic = read_u64(footer, 40);
    if magic != FOOTER_MAGIC {
        return Err(TilestackError::format(format!(
            "incorrect footer magic ({:08x}:{:08x})",
            (magic >> 32) as u32,
            magic as u32
        )));
    }

    let nframes = read_u64(footer, 0);
    if nframes > MAX_NFRAMES {
        return Err(TilestackError::format(format!(
            "footer claims {nframes} frames (limit {MAX_NFRAMES}); file is probably corrupt"
        )));
    }

    let pixel = PixelInfo::new(
        read_u32(footer, 24),
        read_u32(footer, 28),
        PixelFormat::from_code(read_u32(footer, 32))?,
    )?;
    let info = TilestackInfo {
        pixel,
        nframes: nframes as usize,
        tile_width: narrow_u32(read_u64(footer, 8), "tile_width")?,
        tile_height: narrow_u32(read_u64(footer, 16), "tile_height")?,
        compression_format: CompressionFormat::from_code(read_u32(footer, 36))?,
    };
    let bytes_per_frame = info.checked_bytes_per_frame()? as u64;
    if bytes_per_frame > MAX_FRAME_BYTES {
        return Err(TilestackError::format(format!(
            "footer claims {bytes_per_frame}-byte frames (limit {MAX_FRAME_BYTES}); file is probably corrupt"
        )));
    }
    Ok(info)
}

pub fn encode_footer(info: &TilestackInfo, compression: CompressionFormat) -> [u8; 48] {
    let mut footer = [0u8; 48];
    footer[0..8].copy_from_slice(&(info.nframes as u64).to_le_bytes());
    footer[8..16].copy_from_slice(&u64::from(info.tile_width).to_le_bytes());
    footer[16..24].copy_from_slice(&u64::from(info.tile_height).to_le_bytes());
    footer[24..28].copy_from_slice(&info.pixel.bands_per_pixel.to_le_bytes());
    footer[28..32].copy_from_slice(&info.pixel.bits_per_band.to_le_bytes());
    footer[32..36].copy_from_slice(&info.pixel.pixel_format.code().to_le_bytes());
    footer[36..40].copy_from_slice(&compression.code().to_le_bytes());
    footer[40..48].copy_from_slice(&FOOTER_MAGIC.to_le_bytes());
    footer
}

pub fn decode_toc(data: &[u8], nframes: usize) -> Vec<TocEntry> {
    data.chunks_exact(TOC_ENTRY_SIZE as usize)
        .take(nframes)
        .map(|e| TocEntry {
            timestamp: f64::from_le_bytes(e[0..8].try_into().unwrap_or([0; 8])),
            address: read_u64(e, 8),
            length: read_u64(e, 16),
        })
        .collect()
}

pub fn encode_toc(toc: &[TocEntry]) -> Vec<u8> {
    let mut out = Vec::with_capacity(toc.len() * TOC_ENTRY_SIZE as usize);
    for e in toc {
        out.extend_from_slice(&e.timestamp.to_le_bytes());
        out.extend_from_slice(&e.address.to_le_bytes());
        out.extend_from_slice(&e.length.to_le_bytes());
    }
    out
}

/// Read the footer and TOC from the end of a container.
pub fn read_layout<R: Read + Seek>(reader: &mut R) -> TilestackResult<(TilestackInfo, Vec<TocEntry>)> {
    let filelen = reader.seek(SeekFrom::End(0)).context("seek to end")?;
    if filelen < FOOTER_SIZE {
        return Err(TilestackError::format(format!(
            "file is {filelen} bytes, shorter than the {FOOTER_SIZE}-byte footer"
        )));
    }

    let mut footer = [0u8; FOOTER_SIZE as usize];
    reader
        .seek(SeekFrom::Start(filelen - FOOTER_SIZE))
        .context("seek to footer")?;
    reader.read_exact(&mut footer).context("read footer")?;
    let info = decode_footer(&footer)?;

    let toclen = TOC_ENTRY_SIZE * info.nframes as u64;
    let toc_start = (filelen - FOOTER_SIZE).checked_sub(toclen).ok_or_else(|| {
        TilestackError::format(format!(
            "file of {filelen} bytes is too short for a TOC of {} frames",
            info.nframes
        ))
    })?;
    let mut tocdata = vec![0u8; toclen as usize];
    reader
        .seek(SeekFrom::Start(toc_start))
        .context("seek to TOC")?;
    reader.read_exact(&mut tocdata).context("read TOC")?;
    let toc = decode_toc(&tocdata, info.nframes);

    let bytes_per_frame = info.checked_bytes_per_frame()? as u64;
    for (i, e) in toc.iter().enumerate() {
        if info.compression_format == CompressionFormat::None && e.length != bytes_per_frame {
            return Err(TilestackError::format(format!(
                "frame {i}: stored length {} but expected {bytes_per_frame} bytes",
                e.length
            )));
        }
        if e.address.saturating_add(e.length) > toc_start {
            return Err(TilestackError::format(format!(
                "frame {i} payload [{}, +{}) overlaps the TOC at {toc_start}",
                e.address, e.length
            )));
        }
    }
    Ok((info, toc))
}

/// Decode one stored frame payload into `dest` (`bytes_per_frame` long).
pub fn decode_frame(
    frame: usize,
    payload: &[u8],
    compression: CompressionFormat,
    dest: &mut [u8],
) -> TilestackResult<()> {
    match compression {
        CompressionFormat::None => {
            if payload.len() != dest.len() {
                return Err(TilestackError::format(format!(
                    "frame {frame}: stored length {} but expected {} bytes",
                    payload.len(),
                    dest.len()
                )));
            }
            dest.copy_from_slice(payload);
        }
        CompressionFormat::Zlib => {
            let raw = zlib::uncompress_exact(payload, dest.len()).map_err(|e| {
                TilestackError::format(format!(
                    "frame {frame}: expected {} bytes after decompression: {e}",
                    dest.len()
                ))
            })?;
            dest.copy_from_slice(&raw);
        }
    }
    Ok(())
}

/// Serialize every frame of `src` into `sink`.
///
/// Frames are pulled in order, so lazily-derived stacks get materialized frame by frame.
/// Returns the total number of bytes written.
#[tracing::instrument(skip(src, sink))]
pub fn write_tilestack<W: Write>(
    src: &mut dyn Tilestack,
    sink: &mut W,
    compression: CompressionFormat,
) -> TilestackResult<u64> {
    let info = src.info();
    let bytes_per_frame = info.bytes_per_frame();

    sink.write_all(&HEADER_MAGIC.to_le_bytes())
        .context("write header")?;
    let mut filepos = HEADER_SIZE;

    let mut buf: Vec<u8> = Vec::new();
    let mut compressed = Vec::new();
    let mut toc = Vec::with_capacity(info.nframes);

    for i in 0..info.nframes {
        let timestamp = src.frame_timestamp(i)?;
        let pixels = src.frame_pixels(i)?;
        if pixels.len() != bytes_per_frame {
            return Err(TilestackError::geometry(format!(
                "frame {i} has {} bytes, expected {bytes_per_frame}",
                pixels.len()
            )));
        }
        let stored: &[u8] = match compression {
            CompressionFormat::None => pixels,
            CompressionFormat::Zlib => {
                zlib::compress(&mut compressed, pixels)?;
                &compressed
            }
        };
        buf.extend_from_slice(stored);
        toc.push(TocEntry {
            timestamp,
            address: filepos,
            length: stored.len() as u64,
        });
        filepos += stored.len() as u64;

        if buf.len() >= WRITE_FLUSH_THRESHOLD {
            sink.write_all(&buf).context("write frames")?;
            buf.clear();
        }
    }
    sink.write_all(&buf).context("write frames")?;

    let tocdata = encode_toc(&toc);
    sink.write_all(&tocdata).context("write TOC")?;
    sink.write_all(&encode_footer(&info, compression))
        .context("write footer")?;
    sink.flush().context("flush tilestack")?;

    Ok(filepos + tocdata.len() as u64 + FOOTER_SIZE)
}

#[cfg(test)]
#[path = "../../tests/unit/format/container.rs"]
mod tests;
