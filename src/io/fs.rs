//! Filesystem helpers for publishing outputs atomically.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicU32, Ordering},
};

use anyhow::Context as _;

use crate::foundation::error::TilestackResult;

static TEMP_COUNTER: AtomicU32 = AtomicU32::new(0);

/// A fresh sibling of `dest` to write into before [`publish`].
///
/// The extension is kept so tools that sniff it (ffmpeg) still pick the right container:
/// `out/a.mp4` becomes `out/a_tmp1234_0.mp4`.
pub fn temporary_path(dest: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let stem = dest
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut name = format!("{stem}_tmp{}_{n}", std::process::id());
    if let Some(ext) = dest.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    dest.with_file_name(name)
}

/// Move a finished temporary file into place.
pub fn publish(temp: &Path, dest: &Path) -> TilestackResult<()> {
    std::fs::rename(temp, dest)
        .with_context(|| format!("rename '{}' to '{}'", temp.display(), dest.display()))?;
    Ok(())
}

pub fn make_directory_and_parents(dir: &Path) -> TilestackResult<()> {
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
    Ok(())
}

pub fn ensure_parent_dir(path: &Path) -> TilestackResult<()> {
    match path.parent() {
        Some(parent) => make_directory_and_parents(parent),
        None => Ok(()),
    }
}

/// `path` with its final extension removed.
pub fn filename_sans_suffix(path: &Path) -> PathBuf {
    path.with_extension("")
}

/// Write `dest` through a temporary sibling, creating parents first when asked.
pub fn write_atomically<F>(dest: &Path, create_parents: bool, write: F) -> TilestackResult<()>
where
    F: FnOnce(&Path) -> TilestackResult<()>,
{
    if create_parents {
        ensure_parent_dir(dest)?;
    }
    let temp = temporary_path(dest);
    if let Err(e) = write(&temp) {
        let _ = std::fs::remove_file(&temp);
        return Err(e);
    }
    publish(&temp, dest)
}

#[cfg(test)]
#[path = "../../tests/unit/io/fs.rs"]
mod tests;
