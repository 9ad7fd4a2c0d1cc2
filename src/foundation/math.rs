/// Clamp `x` into `[minval, maxval]`.
pub fn limit(x: f64, minval: f64, maxval: f64) -> f64 {
    x.min(maxval).max(minval)
}

/// Round to nearest, ties away from zero.
pub fn round_half_away(x: f64) -> f64 {
    if x > 0.0 {
        (x + 0.5).floor()
    } else {
        (x - 0.5).ceil()
    }
}

/// Linear map of `x` from `[x0, x1]` onto `[y0, y1]`.
pub fn interpolate(x: f64, x0: f64, y0: f64, x1: f64, y1: f64) -> f64 {
    y0 + (x - x0) * (y1 - y0) / (x1 - x0)
}

/// Marsaglia multiply-with-carry generator used for leader noise.
///
/// The exact sequence matters: leaders must be reproducible across runs and tools.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Mwc {
    z: u32,
    w: u32,
}

impl Mwc {
    pub(crate) fn new(z_seed: u32, w_seed: u32) -> Self {
        Self {
            z: z_seed.max(1),
            w: w_seed.max(1),
        }
    }

    pub(crate) fn next_u32(&mut self) -> u32 {
        self.z = 36969u32
            .wrapping_mul(self.z & 0xffff)
            .wrapping_add(self.z >> 16);
        self.w = 18000u32
            .wrapping_mul(self.w & 0xffff)
            .wrapping_add(self.w >> 16);
        (self.z << 16).wrapping_add(self.w)
    }

    pub(crate) fn next_byte(&mut self) -> u8 {
        (self.next_u32() >> 12) as u8
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
