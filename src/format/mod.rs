//! Pixel layouts and the on-disk `.ts2` container.

pub mod container;
pub mod pixel;
pub mod zlib;
