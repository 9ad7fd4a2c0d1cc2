use std::io::{Read as _, Write as _};

use anyhow::Context as _;
use flate2::{Compression, read::ZlibDecoder, write::ZlibEncoder};

use crate::foundation::error::{TilestackError, TilestackResult};

/// Deflate `src` into a zlib stream, replacing the contents of `dest`.
pub fn compress(dest: &mut Vec<u8>, src: &[u8]) -> TilestackResult<()> {
    dest.clear();
    let mut enc = ZlibEncoder::new(std::mem::take(dest), Compression::default());
    enc.write_all(src).context("zlib compress")?;
    *dest = enc.finish().context("zlib compress finish")?;
    Ok(())
}

/// Inflate a zlib stream, requiring exactly `expected_len` output bytes.
pub fn uncompress_exact(src: &[u8], expected_len: usize) -> TilestackResult<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len);
    ZlibDecoder::new(src)
        .read_to_end(&mut out)
        .map_err(|e| TilestackError::format(format!("zlib uncompress failed: {e}")))?;
    if out.len() != expected_len {
        return Err(TilestackError::format(format!(
            "zlib stream inflated to {} bytes, expected {expected_len}",
            out.len()
        )));
    }
    Ok(out)
}
