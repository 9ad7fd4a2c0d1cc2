//! Filesystem and image-file plumbing.

pub mod fs;
pub mod image;
