//! Multi-resolution tile pyramids and the renderer that samples them.

pub mod path_stack;
pub mod projection;
pub mod render;
pub mod stackset;
pub mod tile_address;
