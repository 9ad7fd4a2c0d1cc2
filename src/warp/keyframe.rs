use serde::Deserialize;

use crate::foundation::{
    core::Bbox,
    error::{TilestackError, TilestackResult},
    math::interpolate,
};

/// Corner-form rectangle as written in warp JSON.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct CornerBounds {
    #[serde(default)]
    pub xmin: f64,
    #[serde(default)]
    pub ymin: f64,
    #[serde(default)]
    pub xmax: f64,
    #[serde(default)]
    pub ymax: f64,
}

impl From<CornerBounds> for Bbox {
    fn from(b: CornerBounds) -> Self {
        Bbox::new(b.xmin, b.ymin, b.xmax - b.xmin, b.ymax - b.ymin)
    }
}

#[derive(Debug, Deserialize)]
struct RawKeyframe {
    time: f64,
    bounds: CornerBounds,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
    #[serde(default, rename = "is-loop")]
    is_loop: bool,
    #[serde(default, rename = "loopTimes")]
    loop_times: u32,
    #[serde(default, rename = "waitStart")]
    wait_start: f64,
    #[serde(default, rename = "waitEnd")]
    wait_end: f64,
    #[serde(default, rename = "loopPeriod")]
    loop_period: Option<f64>,
}

/// One control point of a continuous camera path.
///
/// The segment from a keyframe to the next one either plays source time linearly from
/// `time` to `next.time` over `duration` seconds, or (when `looped`) plays a loop of
/// `source_period` seconds of source at `speed`, with dwells at both ends of each pass.
#[derive(Clone, Debug, PartialEq)]
pub struct WarpKeyframe {
    /// Source time at this keyframe, seconds.
    pub time: f64,
    pub bounds: Bbox,
    /// Authored playback duration of a non-looped segment.
    pub duration: Option<f64>,
    /// Playback rate as a fraction (JSON gives percent).
    pub speed: Option<f64>,
    pub looped: bool,
    pub loop_count: u32,
    pub loop_dwell_start: f64,
    pub loop_dwell_end: f64,
    /// Length of source covered by one loop pass.
    pub loop_period: Option<f64>,
}

impl WarpKeyframe {
    /// Parse one keyframe. `default_loop_period` applies to looped keyframes that omit
    /// `loopPeriod`.
    pub fn from_json(
        value: &serde_json::Value,
        default_loop_period: Option<f64>,
    ) -> TilestackResult<Self> {
        let raw = RawKeyframe::deserialize(value)
            .map_err(|e| TilestackError::serde(format!("bad warp keyframe: {e}")))?;
        let k = Self {
            time: raw.time,
            bounds: raw.bounds.into(),
            duration: raw.duration,
            speed: raw.speed.map(|s| s / 100.0),
            looped: raw.is_loop,
            loop_count: raw.loop_times,
            loop_dwell_start: raw.wait_start,
            loop_dwell_end: raw.wait_end,
            loop_period: raw.loop_period.or(default_loop_period),
        };
        if k.looped {
            if !k.speed.is_some_and(|s| s > 0.0) {
                return Err(TilestackError::usage(format!(
                    "looped keyframe at time {} needs a positive speed",
                    k.time
                )));
            }
            if !k.loop_period.is_some_and(|p| p > 0.0) {
                return Err(TilestackError::usage(format!(
                    "looped keyframe at time {} needs loopPeriod or sourceDuration",
                    k.time
                )));
            }
        }
        Ok(k)
    }

    fn speed(&self) -> f64 {
        self.speed.unwrap_or(1.0)
    }

    /// Seconds of source covered by one pass; unbounded for non-looped segments.
    pub fn source_period(&self) -> f64 {
        match (self.looped, self.loop_period) {
            (true, Some(p)) => p,
            _ => f64::INFINITY,
        }
    }

    /// Playback seconds for one pass including both dwells.
    pub fn playback_period(&self) -> f64 {
        self.loop_dwell_start + self.source_period() / self.speed() + self.loop_dwell_end
    }

    /// Playback position within a pass at which `source_time` is shown.
    pub fn playback_offset_at(&self, source_time: f64) -> f64 {
        let mut ret = source_time / self.speed();
        if self.time > 0.0 {
            ret += self.loop_dwell_start;
        }
        ret
    }

    pub fn playback_offset(&self) -> f64 {
        self.playback_offset_at(self.time)
    }

    /// Playback seconds from this keyframe to `next`.
    pub fn duration(&self, next: &WarpKeyframe) -> TilestackResult<f64> {
        if self.looped {
            let mut ret = self.playback_offset_at(next.time) - self.playback_offset();
            if ret < 0.0 {
                ret += self.playback_period();
            }
            Ok(ret + f64::from(self.loop_count) * self.playback_period())
        } else {
            self.duration.ok_or_else(|| {
                TilestackError::usage(format!(
                    "keyframe at time {} has no duration to the next keyframe",
                    self.time
                ))
            })
        }
    }

    /// Source time shown `t` playback seconds after this keyframe.
    pub fn compute_source_time(&self, t: f64, next: &WarpKeyframe) -> TilestackResult<f64> {
        if self.looped {
            let playback = (t + self.playback_offset()) % self.playback_period() - self.loop_dwell_start;
            Ok(self.source_period().min(playback.max(0.0) * self.speed()))
        } else {
            Ok(interpolate(t, 0.0, self.time, self.duration(next)?, next.time))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/warp/keyframe.rs"]
mod tests;
