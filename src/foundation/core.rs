use crate::foundation::math::interpolate;

/// Axis-aligned rectangle in source-pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bbox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bbox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn scaled(self, scale: f64) -> Self {
        Self::new(
            self.x * scale,
            self.y * scale,
            self.width * scale,
            self.height * scale,
        )
    }

    pub fn center(self) -> (f64, f64) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Interpolate between `f0` at `t0` and `f1` at `t1` so that the zoom rate is constant.
    ///
    /// A linear lerp of widths makes zooming in feel like it accelerates; here the fraction
    /// travelled follows `(s^u - 1) / (s - 1)` with `s = f1.width / f0.width`. Pure pans
    /// (`s ~= 1`) fall back to a linear fraction.
    pub fn scaled_interpolate(t: f64, t0: f64, f0: Bbox, t1: f64, f1: Bbox) -> Bbox {
        let time_ratio = (t - t0) / (t1 - t0);
        let s1_over_s0 = f1.width / f0.width;

        let f_of_t = if (s1_over_s0 - 1.0).abs() < 1e-4 || !s1_over_s0.is_finite() {
            time_ratio
        } else {
            (s1_over_s0.powf(time_ratio) - 1.0) / (s1_over_s0 - 1.0)
        };

        Bbox::new(
            interpolate(f_of_t, 0.0, f0.x, 1.0, f1.x),
            interpolate(f_of_t, 0.0, f0.y, 1.0, f1.y),
            interpolate(f_of_t, 0.0, f0.width, 1.0, f1.width),
            interpolate(f_of_t, 0.0, f0.height, 1.0, f1.height),
        )
    }
}

impl std::ops::Add for Bbox {
    type Output = Bbox;

    fn add(self, rhs: Bbox) -> Bbox {
        Bbox::new(
            self.x + rhs.x,
            self.y + rhs.y,
            self.width + rhs.width,
            self.height + rhs.height,
        )
    }
}

impl std::ops::Div<f64> for Bbox {
    type Output = Bbox;

    fn div(self, denom: f64) -> Bbox {
        self.scaled(1.0 / denom)
    }
}

impl std::fmt::Display for Bbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[bbox x={} y={} width={} height={}]",
            self.x, self.y, self.width, self.height
        )
    }
}

/// One output frame of a path: which source frame to show, and where.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Frame {
    pub frameno: i64,
    pub bounds: Bbox,
}

impl Frame {
    /// Marker returned by the warp interpolator once a path has ended.
    pub const SENTINEL: Frame = Frame {
        frameno: -1,
        bounds: Bbox {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        },
    };

    pub fn new(frameno: i64, bounds: Bbox) -> Self {
        Self { frameno, bounds }
    }

    pub fn is_sentinel(&self) -> bool {
        self.frameno < 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
