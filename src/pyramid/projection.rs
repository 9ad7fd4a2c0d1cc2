//! Equirectangular panorama to equidistant-azimuthal dome reprojection.
//!
//! The panorama is a plate-carrée strip: columns `xr1..xr2` span one full turn of azimuth
//! around `(xr1 + xr2) / 2`, and row `yr` is the horizon. Angles grow by `px_per_radian`
//! source pixels per radian in both directions.
//!
//! The dome image is centered on its optical axis. A dome pixel at distance `r` from the center
//! and clockwise angle `phi` from "up" looks `theta = r / (zoom * px_per_radian)` radians away
//! from the axis. The axis itself points at the configured yaw and pitch plus the viewport
//! center's offset from the panorama's horizon center.

use std::f64::consts::{FRAC_PI_2, PI};

use glam::{DMat3, DVec3};

use crate::{
    foundation::{
        core::Frame,
        error::{TilestackError, TilestackResult},
    },
    pyramid::{
        render::{Bilinear, Image},
        stackset::PixelSource,
    },
};

/// Where the panorama sits in source-pixel space, and where the dome looks.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectionParams {
    pub px_per_radian: f64,
    /// First column of the panorama's 360-degree span.
    pub xr1: f64,
    /// One past the last column of the span.
    pub xr2: f64,
    /// Horizon row.
    pub yr: f64,
    /// Elevation of the dome axis, degrees.
    pub pitch: f64,
    /// Azimuth of the dome axis, degrees.
    pub yaw: f64,
}

/// Angular extent of the dome that receives pixels; everything else is zero.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectionWindow {
    /// Azimuthal half-field around "up", degrees.
    pub field: f64,
    /// Lowest dome-local elevation, degrees.
    pub bottom: f64,
    /// Highest dome-local elevation, degrees.
    pub top: f64,
}

impl Default for ProjectionWindow {
    fn default() -> Self {
        Self {
            field: 180.0,
            bottom: -90.0,
            top: 90.0,
        }
    }
}

impl ProjectionWindow {
    /// Whether the dome direction `(theta, phi)` falls inside the window.
    pub fn contains(&self, theta: f64, phi: f64) -> bool {
        let elevation = FRAC_PI_2 - theta;
        phi.abs() <= self.field.to_radians()
            && elevation >= self.bottom.to_radians()
            && elevation <= self.top.to_radians()
    }
}

impl ProjectionParams {
    pub fn validate(&self) -> TilestackResult<()> {
        if !self.px_per_radian.is_finite() || self.px_per_radian <= 0.0 {
            return Err(TilestackError::usage("pxPerRadian must be positive"));
        }
        if !(self.xr2 - self.xr1).is_finite() || self.xr2 <= self.xr1 {
            return Err(TilestackError::usage(format!(
                "panorama span XR1={} XR2={} is empty",
                self.xr1, self.xr2
            )));
        }
        Ok(())
    }

    fn center_x(&self) -> f64 {
        (self.xr1 + self.xr2) / 2.0
    }

    /// Rotation taking dome-local directions (axis = +z) into panorama space for `frame`.
    ///
    /// Panorama space has +z at the zenith and +y at azimuth 0 on the horizon; azimuth grows
    /// toward +x.
    pub fn rotation(&self, frame: &Frame) -> DMat3 {
        let (azimuth, elevation) = self.axis(frame);
        DMat3::from_rotation_z(-azimuth) * DMat3::from_rotation_x(-(FRAC_PI_2 - elevation))
    }

    /// Azimuth and elevation of the dome axis, radians.
    fn axis(&self, frame: &Frame) -> (f64, f64) {
        let b = frame.bounds;
        let (cx, cy) = if b.width > 0.0 && b.height > 0.0 {
            b.center()
        } else {
            (self.center_x(), self.yr)
        };
        (
            self.yaw.to_radians() + (cx - self.center_x()) / self.px_per_radian,
            self.pitch.to_radians() + (self.yr - cy) / self.px_per_radian,
        )
    }

    /// Panorama source pixel seen along panorama-space direction `d`.
    pub fn source_pixel(&self, d: DVec3) -> (f64, f64) {
        let azimuth = d.x.atan2(d.y);
        let elevation = d.z.clamp(-1.0, 1.0).asin();
        let span = self.xr2 - self.xr1;
        let sx = (self.center_x() + azimuth * self.px_per_radian - self.xr1).rem_euclid(span)
            + self.xr1;
        let sy = self.yr - elevation * self.px_per_radian;
        (sx, sy)
    }
}

/// Dome-local direction for polar angles `theta` (from the axis) and `phi` (clockwise from up).
pub fn dome_direction(theta: f64, phi: f64) -> DVec3 {
    DVec3::new(theta.sin() * phi.sin(), theta.sin() * phi.cos(), theta.cos())
}

/// Render one dome frame, sampling the finest pyramid level.
#[tracing::instrument(level = "trace", skip_all, fields(frameno = frame.frameno))]
pub fn render_projection<S: PixelSource + ?Sized>(
    src: &mut S,
    dest: &mut Image<'_>,
    frame: &Frame,
    params: &ProjectionParams,
    window: &ProjectionWindow,
) -> TilestackResult<()> {
    params.validate()?;
    if frame.frameno < 0 {
        return Err(TilestackError::geometry(format!("cannot render frame {}", frame.frameno)));
    }
    let frameno = frame.frameno as usize;
    let level = src.nlevels() - 1;
    let (w, h) = (f64::from(dest.width), f64::from(dest.height));
    let b = frame.bounds;
    let zoom = if b.width > 0.0 && b.height > 0.0 {
        (h / b.width).max(w / b.height)
    } else {
        1.0
    };
    let rotation = params.rotation(frame);
    let mut sampler = Bilinear::new(src.pixel_info(), dest.pixel);

    for y in 0..dest.height {
        let dy = f64::from(y) + 0.5 - h / 2.0;
        for x in 0..dest.width {
            let dx = f64::from(x) + 0.5 - w / 2.0;
            let theta = dx.hypot(dy) / (zoom * params.px_per_radian);
            let phi = dx.atan2(-dy);
            let out = dest.pixel_mut(x, y);
            if theta > PI || !window.contains(theta, phi) {
                out.fill(0);
                continue;
            }
            let (sx, sy) = params.source_pixel(rotation * dome_direction(theta, phi));
            sampler.sample(src, out, frameno, level, sx, sy)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/pyramid/projection.rs"]
mod tests;
