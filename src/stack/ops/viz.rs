use serde_json::Value;

use crate::{
    foundation::error::{TilestackError, TilestackResult},
    stack::{LazyTilestack, LruFrames, SharedTilestack, copy_frame},
};

use super::frames_like;

/// Tone curve for one band.
///
/// `gamma > 1` brightens midtones; `< 1` darkens them. `maxval` defaults to 256 so 8-bit input
/// maps onto the full range.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VizBand {
    one_over_gamma: f64,
    maxval: f64,
    gain_over_maxval: f64,
}

impl VizBand {
    pub fn new(gain: f64, gamma: f64, maxval: f64) -> TilestackResult<Self> {
        if gamma == 0.0 || maxval == 0.0 {
            return Err(TilestackError::usage("viz: gamma and maxval must be non-zero"));
        }
        Ok(Self {
            one_over_gamma: 1.0 / gamma,
            maxval,
            gain_over_maxval: gain / maxval,
        })
    }

    /// Read `gain`, `gamma` and `maxval` for `band` from a viz parameter object.
    ///
    /// Each may be absent, a number, or an array with at least one entry per band.
    pub fn from_params(params: &Value, band: usize) -> TilestackResult<Self> {
        Self::new(
            param(params, "gain", band, 1.0)?,
            param(params, "gamma", band, 1.0)?,
            param(params, "maxval", band, 256.0)?,
        )
    }

    pub fn apply(&self, value: f64) -> f64 {
        self.maxval * (value * self.gain_over_maxval).max(0.0).powf(self.one_over_gamma)
    }
}

fn param(params: &Value, name: &str, band: usize, default: f64) -> TilestackResult<f64> {
    let bad = || TilestackError::usage(format!("viz: '{name}' must be a number or array of numbers"));
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Array(values)) => values
            .get(band)
            .ok_or_else(|| {
                TilestackError::usage(format!(
                    "too few values to viz:{name} (must have at least the number of image bands)"
                ))
            })?
            .as_f64()
            .ok_or_else(bad),
        Some(v) => v.as_f64().ok_or_else(bad),
    }
}

/// Per-band recolor of an upstream stack. Output layout equals the input's.
pub struct VizTilestack {
    src: SharedTilestack,
    bands: Vec<VizBand>,
    frames: LruFrames,
    scratch: Vec<f64>,
}

impl VizTilestack {
    pub fn new(src: SharedTilestack, params: &Value) -> TilestackResult<Self> {
        if !params.is_object() {
            return Err(TilestackError::usage("viz parameters must be a JSON object"));
        }
        let info = src.borrow().info();
        let bands = (0..info.pixel.bands_per_pixel as usize)
            .map(|b| VizBand::from_params(params, b))
            .collect::<TilestackResult<Vec<_>>>()?;
        Ok(Self {
            frames: frames_like(&src, info)?,
            src,
            bands,
            scratch: Vec::new(),
        })
    }
}

impl LazyTilestack for VizTilestack {
    fn frames(&self) -> &LruFrames {
        &self.frames
    }

    fn frames_mut(&mut self) -> &mut LruFrames {
        &mut self.frames
    }

    fn instantiate_pixels(&mut self, frame: usize, dest: &mut [u8]) -> TilestackResult<()> {
        let pixel = self.frames.info.pixel;
        let src = copy_frame(&self.src, frame)?;
        pixel.decode_into(&src, &mut self.scratch)?;
        let nbands = self.bands.len();
        for (i, v) in self.scratch.iter_mut().enumerate() {
            *v = self.bands[i % nbands].apply(*v);
        }
        pixel.encode_from(&self.scratch, dest)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/stack/ops/viz.rs"]
mod tests;
