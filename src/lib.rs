#![forbid(unsafe_code)]

//! Time-lapse tilestacks: the `.ts2` container, lazily evaluated derived stacks, gigapixel
//! pyramid rendering along camera paths, and the `tilestacktool` script interpreter.

pub mod encode;
pub mod format;
pub mod foundation;
pub mod io;
pub mod pyramid;
pub mod stack;
pub mod tool;
pub mod warp;

pub use format::pixel::{CompressionFormat, PixelFormat, PixelInfo, TilestackInfo};
pub use foundation::core::{Bbox, Frame};
pub use foundation::error::{TilestackError, TilestackResult};
pub use pyramid::stackset::{PixelSource, SingleStackSource, Stackset};
pub use stack::{SharedTilestack, Tilestack, share};
