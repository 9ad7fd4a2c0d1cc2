//! Camera paths over a pyramid: discrete frame lists and keyframed warps.

pub mod keyframe;
pub mod path;
