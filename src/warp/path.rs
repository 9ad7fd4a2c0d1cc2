//! Turning path and warp JSON into concrete frame sequences.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    foundation::{
        core::{Bbox, Frame},
        error::{TilestackError, TilestackResult},
        math::round_half_away,
    },
    warp::keyframe::WarpKeyframe,
};

/// Symmetric sample pairs averaged by temporal smoothing.
const SMOOTHING_SAMPLES: u32 = 50;

/// Output timing for continuous warps.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, Deserialize)]
pub struct WarpSettings {
    /// Output frames per second.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Capture rate of the source, used to turn source time into frame numbers.
    #[serde(default = "default_source_fps", rename = "sourceFPS")]
    pub source_fps: f64,
    /// Half-width of the bounds smoothing window, seconds.
    #[serde(default)]
    pub smoothing: f64,
    /// Loop period for looped keyframes that don't carry their own.
    #[serde(default, rename = "sourceDuration")]
    pub source_duration: Option<f64>,
}

fn default_fps() -> f64 {
    25.0
}

fn default_source_fps() -> f64 {
    10.0
}

impl Default for WarpSettings {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            source_fps: default_source_fps(),
            smoothing: 0.0,
            source_duration: None,
        }
    }
}

impl WarpSettings {
    pub fn from_json(value: &Value) -> TilestackResult<Self> {
        let settings = Self::deserialize(value)
            .map_err(|e| TilestackError::serde(format!("bad warp settings: {e}")))?;
        if !(settings.fps.is_finite() && settings.fps > 0.0) {
            return Err(TilestackError::usage("warp settings: fps must be positive"));
        }
        if !(settings.source_fps.is_finite() && settings.source_fps > 0.0) {
            return Err(TilestackError::usage("warp settings: sourceFPS must be positive"));
        }
        Ok(settings)
    }
}

#[derive(Debug, Deserialize)]
struct SizeBounds {
    #[serde(default)]
    xmin: f64,
    #[serde(default)]
    ymin: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
}

#[derive(Debug, Deserialize)]
struct FrameRange {
    start: i64,
    end: i64,
    #[serde(default = "default_step")]
    step: i64,
}

fn default_step() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
struct FrameDescriptor {
    bounds: SizeBounds,
    #[serde(default)]
    frame: Option<f64>,
    #[serde(default)]
    frames: Option<FrameRange>,
}

/// Expand a discrete path: an array of `{"frame": n, "bounds": ..}` or
/// `{"frames": {"start", "end", "step"}, "bounds": ..}` descriptors. A lone descriptor is a
/// one-element path.
pub fn parse_framelist(path: &Value) -> TilestackResult<Vec<Frame>> {
    let descriptors = match path {
        Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    let mut frames = Vec::new();
    for (i, desc) in descriptors.iter().enumerate() {
        let desc = FrameDescriptor::deserialize(desc)
            .map_err(|e| TilestackError::serde(format!("path segment {i}: {e}")))?;
        let b = desc.bounds;
        let bounds = Bbox::new(b.xmin, b.ymin, b.width, b.height);
        match (desc.frames, desc.frame) {
            (Some(range), _) => expand_range(&range, bounds, i, &mut frames)?,
            (None, Some(frame)) => frames.push(Frame::new(frame.trunc() as i64, bounds)),
            (None, None) => {
                return Err(TilestackError::usage(format!(
                    "path segment {i} has neither a 'frame' nor a 'frames' field"
                )));
            }
        }
    }
    Ok(frames)
}

fn expand_range(
    range: &FrameRange,
    bounds: Bbox,
    segment: usize,
    out: &mut Vec<Frame>,
) -> TilestackResult<()> {
    let forward = range.end >= range.start;
    if range.start != range.end && (range.step == 0 || (range.step > 0) != forward) {
        return Err(TilestackError::usage(format!(
            "path segment {segment}: step {} never reaches frame {} from {}",
            range.step, range.end, range.start
        )));
    }
    let mut j = range.start;
    loop {
        out.push(Frame::new(j, bounds));
        if j == range.end {
            break;
        }
        j += range.step;
        if (forward && j > range.end) || (!forward && j < range.end) {
            break;
        }
    }
    Ok(())
}

/// A continuous camera path through keyframes.
#[derive(Clone, Debug, PartialEq)]
pub struct Warp {
    keyframes: Vec<WarpKeyframe>,
}

impl Warp {
    pub fn new(keyframes: Vec<WarpKeyframe>) -> TilestackResult<Self> {
        if keyframes.len() < 2 {
            return Err(TilestackError::usage(format!(
                "a warp needs at least two keyframes, got {}",
                keyframes.len()
            )));
        }
        Ok(Self { keyframes })
    }

    /// Parse `{"snaplapse": {"keyframes": [..]}}` or the same under `"timewarp"`.
    pub fn from_json(value: &Value, settings: &WarpSettings) -> TilestackResult<Self> {
        let body = value
            .get("snaplapse")
            .or_else(|| value.get("timewarp"))
            .ok_or_else(|| TilestackError::usage("warp needs a 'snaplapse' or 'timewarp' field"))?;
        let keyframes = body
            .get("keyframes")
            .and_then(Value::as_array)
            .ok_or_else(|| TilestackError::usage("warp needs a 'keyframes' array"))?;
        let keyframes = keyframes
            .iter()
            .map(|k| WarpKeyframe::from_json(k, settings.source_duration))
            .collect::<TilestackResult<Vec<_>>>()?;
        Self::new(keyframes)
    }

    pub fn keyframes(&self) -> &[WarpKeyframe] {
        &self.keyframes
    }

    /// Playback seconds from the first keyframe to the last.
    pub fn total_duration(&self) -> TilestackResult<f64> {
        self.keyframes
            .windows(2)
            .map(|pair| pair[0].duration(&pair[1]))
            .sum()
    }

    /// Source time and bounds at playback time `t`, or `None` outside the path.
    fn sample(&self, t: f64) -> TilestackResult<Option<(f64, Bbox)>> {
        if t < 0.0 {
            return Ok(None);
        }
        let last = self.keyframes.len() - 2;
        let mut start = 0.0;
        for (i, pair) in self.keyframes.windows(2).enumerate() {
            let (k, next) = (&pair[0], &pair[1]);
            let d = k.duration(next)?;
            if t < start + d || (i == last && t <= start + d) {
                if d <= 0.0 {
                    return Ok(Some((next.time, next.bounds)));
                }
                let local = t - start;
                let bounds = Bbox::scaled_interpolate(local, 0.0, k.bounds, d, next.bounds);
                return Ok(Some((k.compute_source_time(local, next)?, bounds)));
            }
            start += d;
        }
        Ok(None)
    }

    /// The frame shown at playback time `t`, or [`Frame::SENTINEL`] past the end.
    ///
    /// With `smoothing > 0` the bounds are averaged with up to 50 symmetric pairs of samples at
    /// `t ± smoothing * i / 50`; a pair is dropped whole when either side leaves the path.
    pub fn compute_frame(&self, t: f64, source_fps: f64, smoothing: f64) -> TilestackResult<Frame> {
        let Some((source_time, mut bounds)) = self.sample(t)? else {
            return Ok(Frame::SENTINEL);
        };
        if smoothing > 0.0 {
            let total = self.total_duration()?;
            let mut sum = bounds;
            let mut count = 1.0;
            for i in 1..=SMOOTHING_SAMPLES {
                let dt = smoothing * f64::from(i) / f64::from(SMOOTHING_SAMPLES);
                if t - dt < 0.0 || t + dt > total {
                    continue;
                }
                if let (Some((_, before)), Some((_, after))) = (self.sample(t - dt)?, self.sample(t + dt)?) {
                    sum = sum + before + after;
                    count += 2.0;
                }
            }
            bounds = sum / count;
        }
        Ok(Frame::new(round_half_away(source_time * source_fps).max(0.0) as i64, bounds))
    }
}

/// Frames for `path`: either a discrete frame list or a continuous warp sampled at
/// `settings.fps`. Warp frame numbers are clamped to the source's `source_nframes`.
#[tracing::instrument(skip_all, fields(source_nframes = source_nframes))]
pub fn parse_warp(
    path: &Value,
    settings: &WarpSettings,
    source_nframes: usize,
) -> TilestackResult<Vec<Frame>> {
    let is_warp = path
        .as_object()
        .is_some_and(|o| o.contains_key("snaplapse") || o.contains_key("timewarp"));
    if !is_warp {
        return parse_framelist(path);
    }
    if source_nframes == 0 {
        return Err(TilestackError::geometry("cannot warp over a source with no frames"));
    }
    let warp = Warp::from_json(path, settings)?;
    let max_frame = (source_nframes - 1) as i64;
    let mut frames = Vec::new();
    for i in 0u64.. {
        let t = i as f64 / settings.fps;
        let frame = warp.compute_frame(t, settings.source_fps, settings.smoothing)?;
        if frame.is_sentinel() {
            break;
        }
        frames.push(Frame::new(frame.frameno.clamp(0, max_frame), frame.bounds));
    }
    tracing::debug!(nframes = frames.len(), "sampled warp");
    Ok(frames)
}

#[cfg(test)]
#[path = "../../tests/unit/warp/path.rs"]
mod tests;
