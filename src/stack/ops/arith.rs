use crate::{
    foundation::error::TilestackResult,
    stack::{LazyTilestack, LruFrames, SharedTilestack, copy_frame},
};

use super::{check_same_geometry, frames_like};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
}

impl BinaryOp {
    fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
        }
    }
}

/// Band-wise `a op b` over two stacks of identical geometry.
pub struct BinopTilestack {
    a: SharedTilestack,
    b: SharedTilestack,
    op: BinaryOp,
    frames: LruFrames,
    a_values: Vec<f64>,
    b_values: Vec<f64>,
}

impl BinopTilestack {
    pub fn new(a: SharedTilestack, b: SharedTilestack, op: BinaryOp) -> TilestackResult<Self> {
        let ai = a.borrow().info();
        let bi = b.borrow().info();
        check_same_geometry(op.name(), &ai, &bi)?;
        Ok(Self {
            frames: frames_like(&a, ai)?,
            a,
            b,
            op,
            a_values: Vec::new(),
            b_values: Vec::new(),
        })
    }
}

impl LazyTilestack for BinopTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let pixel = self.frames.info.pixel;
        pixel.decode_into(&copy_frame(&self.a, frame)?, &mut self.a_values)?;
        pixel.decode_into(&copy_frame(&self.b, frame)?, &mut self.b_values)?;
        let op = self.op;
        for (a, &b) in self.a_values.iter_mut().zip(&self.b_values) {
            *a = op.apply(*a, b);
        }
        pixel.encode_from(&self.a_values, dest)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UnaryOp {
    Scale(f64),
}

impl UnaryOp {
    fn apply(self, v: f64) -> f64 {
        match self {
            Self::Scale(k) => v * k,
        }
    }
}

/// Band-wise unary arithmetic on one stack.
pub struct UnopTilestack {
    src: SharedTilestack,
    op: UnaryOp,
    frames: LruFrames,
    values: Vec<f64>,
}

impl UnopTilestack {
    pub fn new(src: SharedTilestack, op: UnaryOp) -> TilestackResult<Self> {
        let info = src.borrow().info();
        Ok(Self {
            frames: frames_like(&src, info)?,
            src,
            op,
            values: Vec::new(),
        })
    }
}

impl LazyTilestack for UnopTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let pixel = self.frames.info.pixel;
        pixel.decode_into(&copy_frame(&self.src, frame)?, &mut self.values)?;
        for v in &mut self.values {
            *v = self.op.apply(*v);
        }
        pixel.encode_from(&self.values, dest)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/stack/ops/arith.rs"]
mod tests;
