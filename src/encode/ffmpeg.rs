use std::{
    io::Write as _,
    path::{Path, PathBuf},
    process::{Child, ChildStdin, Command, Stdio},
};

use crate::foundation::error::{TilestackError, TilestackResult};

/// Environment variable naming the ffmpeg executable to use.
pub const FFMPEG_ENV: &str = "TILESTACK_FFMPEG";

/// Sink for raw rgb24 frames.
pub trait VideoEncoder {
    /// Append whole frames of interleaved 8-bit RGB.
    fn write_pixels(&mut self, pixels: &[u8]) -> TilestackResult<()>;

    /// Flush and wait for the output to be complete.
    fn close(&mut self) -> TilestackResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    Vp8,
    ProresHq,
}

impl VideoCodec {
    /// Codec implied by the extension of `dest`: `.mp4`, `.webm` or `.mov`.
    pub fn from_path(dest: &Path) -> TilestackResult<Self> {
        let ext = dest
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp4" => Ok(Self::H264),
            "webm" => Ok(Self::Vp8),
            "mov" => Ok(Self::ProresHq),
            _ => Err(TilestackError::usage(format!(
                "don't know how to encode video to '{}' (use .mp4, .webm or .mov)",
                dest.display()
            ))),
        }
    }

    /// Output-side ffmpeg arguments for quality `compression`.
    pub fn output_args(self, compression: f64) -> Vec<String> {
        let args: &[&str] = match self {
            Self::H264 => &[
                "-c:v", "libx264", "-preset", "slow", "-pix_fmt", "yuv420p", "-g", "10", "-bf",
                "0", "-movflags", "+faststart", "-crf",
            ],
            Self::Vp8 => &[
                "-c:v", "libvpx", "-qmin", "0", "-qmax", "34", "-b:v", "5M", "-g", "20", "-crf",
            ],
            Self::ProresHq => &[
                "-c:v",
                "prores_ks",
                "-profile:v",
                "3",
                "-vendor",
                "ap10",
                "-pix_fmt",
                "yuv422p10le",
                "-qscale:v",
            ],
        };
        let quality = match self {
            Self::Vp8 => (compression / 2.0).ceil(),
            _ => compression,
        };
        let mut out: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
        out.push(quality.to_string());
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Codec-specific quality knob; for H.264, 24 is high quality and 32 low.
    pub compression: f64,
    pub codec: VideoCodec,
}

impl VideoConfig {
    pub fn validate(&self) -> TilestackResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(TilestackError::usage("video width/height must be non-zero"));
        }
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(TilestackError::usage("video fps must be positive"));
        }
        if self.codec == VideoCodec::H264
            && (!self.width.is_multiple_of(2) || !self.height.is_multiple_of(2))
        {
            return Err(TilestackError::usage(format!(
                "{}x{}: H.264 output needs even width and height (yuv420p)",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

/// Places to look for a bundled ffmpeg next to the running executable.
pub fn ffmpeg_search_path() -> Vec<PathBuf> {
    let exe = format!("ffmpeg{}", std::env::consts::EXE_SUFFIX);
    let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
    else {
        return Vec::new();
    };
    vec![
        dir.join("ffmpeg").join(std::env::consts::OS).join(&exe),
        dir.join(&exe),
    ]
}

/// The ffmpeg to run and every candidate considered on the way.
///
/// `TILESTACK_FFMPEG` wins outright; then the bundled locations; then plain `ffmpeg` from
/// `PATH`.
pub fn locate_ffmpeg() -> (PathBuf, Vec<PathBuf>) {
    if let Some(exe) = std::env::var_os(FFMPEG_ENV).filter(|v| !v.is_empty()) {
        let exe = PathBuf::from(exe);
        return (exe.clone(), vec![exe]);
    }
    let mut searched = ffmpeg_search_path();
    if let Some(found) = searched.iter().find(|p| p.is_file()) {
        tracing::info!(path = %found.display(), "found ffmpeg");
        return (found.clone(), searched);
    }
    tracing::info!(?searched, "no bundled ffmpeg; using the one in PATH, if available");
    let fallback = PathBuf::from(format!("ffmpeg{}", std::env::consts::EXE_SUFFIX));
    searched.push(fallback.clone());
    (fallback, searched)
}

/// Whether the located ffmpeg runs at all.
pub fn ffmpeg_selftest() -> bool {
    let (exe, _) = locate_ffmpeg();
    let ok = Command::new(&exe)
        .args(["-loglevel", "error", "-version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if ok {
        tracing::info!(exe = %exe.display(), "ffmpeg: success");
    } else {
        tracing::warn!(exe = %exe.display(), "ffmpeg can't be run; likely an installation problem");
    }
    ok
}

/// Encoder that pipes raw rgb24 into an ffmpeg subprocess.
pub struct FfmpegEncoder {
    config: VideoConfig,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    total_written: usize,
}

impl FfmpegEncoder {
    /// Start encoding to `dest` with the located ffmpeg.
    pub fn new(dest: &Path, config: VideoConfig) -> TilestackResult<Self> {
        let (exe, searched) = locate_ffmpeg();
        Self::spawn(&exe, &searched, dest, config)
    }

    /// Start encoding to `dest` with a specific ffmpeg executable.
    pub fn with_executable(exe: &Path, dest: &Path, config: VideoConfig) -> TilestackResult<Self> {
        Self::spawn(exe, &[exe.to_path_buf()], dest, config)
    }

    fn spawn(
        exe: &Path,
        searched: &[PathBuf],
        dest: &Path,
        config: VideoConfig,
    ) -> TilestackResult<Self> {
        config.validate()?;
        let mut cmd = Command::new(exe);
        cmd.env("AV_LOG_FORCE_NOCOLOR", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-s",
            &format!("{}x{}", config.width, config.height),
            "-r",
            &config.fps.to_string(),
            "-i",
            "pipe:0",
            "-an",
        ])
        .args(config.codec.output_args(config.compression))
        .arg(dest);
        tracing::debug!(?cmd, "spawning ffmpeg");

        let mut child = cmd.spawn().map_err(|e| {
            let tried = searched
                .iter()
                .map(|p| format!("  {}", p.display()))
                .collect::<Vec<_>>()
                .join("\n");
            TilestackError::resource(format!(
                "failed to run ffmpeg '{}': {e}\nsearched:\n{tried}",
                exe.display()
            ))
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TilestackError::resource("failed to open ffmpeg stdin"))?;
        Ok(Self {
            config,
            child: Some(child),
            stdin: Some(stdin),
            total_written: 0,
        })
    }

    pub fn frames_written(&self) -> usize {
        self.total_written / self.config.frame_bytes()
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn write_pixels(&mut self, pixels: &[u8]) -> TilestackResult<()> {
        if !pixels.len().is_multiple_of(self.config.frame_bytes()) {
            return Err(TilestackError::geometry(format!(
                "{} bytes is not a whole number of {}x{} rgb24 frames",
                pixels.len(),
                self.config.width,
                self.config.height
            )));
        }
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(TilestackError::resource("ffmpeg encoder is already closed"));
        };
        stdin
            .write_all(pixels)
            .map_err(|e| TilestackError::resource(format!("error writing to ffmpeg: {e}")))?;
        self.total_written += pixels.len();
        Ok(())
    }

    fn close(&mut self) -> TilestackResult<()> {
        drop(self.stdin.take());
        let Some(child) = self.child.take() else {
            return Ok(());
        };
        let output = child
            .wait_with_output()
            .map_err(|e| TilestackError::resource(format!("failed to wait for ffmpeg: {e}")))?;
        tracing::info!(
            frames = self.frames_written(),
            bytes = self.total_written,
            "wrote frames to ffmpeg"
        );
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TilestackError::resource(format!(
                "ffmpeg exited with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
