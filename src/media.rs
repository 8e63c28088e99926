//! Video helpers backed by the `ffmpeg` and `ffprobe` command line tools.
//!
//! All of this is best effort. Callers degrade to text-only requests when a
//! frame cannot be produced.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::display_width::preview;
use crate::error::MediaError;

pub trait MediaTool {
    /// Up to `max_count` JPEG frames sampled evenly across the video.
    fn extract_frames(&self, video: &Path, max_count: usize) -> Result<Vec<Vec<u8>>, MediaError>;

    /// Cuts `[start, end]` seconds of `video` into `output`.
    fn trim(&self, video: &Path, start: f64, end: f64, output: &Path) -> Result<PathBuf, MediaError>;

    /// Length in seconds, when it can be determined.
    fn duration(&self, video: &Path) -> Option<f64>;
}

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Ffmpeg {
    const DEFAULT_FPS: f64 = 25.0;
    const DEFAULT_TOTAL_FRAMES: usize = 1000;

    /// `ffprobe` is looked up next to the given `ffmpeg`.
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        let ffmpeg = ffmpeg.into();
        let ffprobe = ffmpeg.with_file_name(
            ffmpeg
                .file_name()
                .and_then(OsStr::to_str)
                .map(|name| name.replace("ffmpeg", "ffprobe"))
                .unwrap_or_else(|| "ffprobe".to_string()),
        );
        Self { ffmpeg, ffprobe }
    }

    fn probe(&self, video: &Path, entries: &str) -> Result<ProbeOutput, MediaError> {
        let mut args = vec!["-v", "error"];
        if entries.starts_with("stream=") {
            args.extend(["-select_streams", "v:0"]);
        }
        args.extend(["-show_entries", entries, "-of", "json"]);
        let stdout = run(&self.ffprobe, args.iter().map(OsStr::new).chain([video.as_os_str()]))?;
        serde_json::from_slice(&stdout).map_err(|e| MediaError::ToolFailed {
            tool: "ffprobe".into(),
            message: e.to_string(),
        })
    }

    /// Frame rate and frame count, estimating the count from the duration when
    /// the container does not record it.
    fn frame_stats(&self, video: &Path) -> Result<(f64, usize), MediaError> {
        let probe = self.probe(video, "stream=r_frame_rate,nb_frames")?;
        let stream = probe.streams.into_iter().next().unwrap_or_default();
        let fps = stream
            .r_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .unwrap_or(Self::DEFAULT_FPS);
        let frames = stream
            .nb_frames
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n > 0);
        let total = match frames {
            Some(n) => n,
            None => self
                .duration(video)
                .map(|secs| (secs * fps) as usize)
                .unwrap_or(Self::DEFAULT_TOTAL_FRAMES),
        };
        Ok((fps, total))
    }
}

impl MediaTool for Ffmpeg {
    fn extract_frames(&self, video: &Path, max_count: usize) -> Result<Vec<Vec<u8>>, MediaError> {
        if !video.exists() {
            return Err(MediaError::NotFound(video.display().to_string()));
        }
        if max_count == 0 {
            return Ok(Vec::new());
        }

        let (_, total) = self.frame_stats(video).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "could not probe video, assuming defaults");
            (Self::DEFAULT_FPS, Self::DEFAULT_TOTAL_FRAMES)
        });
        let interval = frame_interval(total, max_count);

        let dir = tempfile::tempdir()?;
        let pattern = dir.path().join("frame_%04d.jpg");
        let select = format!("select=not(mod(n\\,{interval}))");
        let count = max_count.to_string();
        let args: [&OsStr; 13] = [
            "-v".as_ref(),
            "error".as_ref(),
            "-i".as_ref(),
            video.as_os_str(),
            "-vf".as_ref(),
            select.as_ref(),
            "-vsync".as_ref(),
            "vfr".as_ref(),
            "-q:v".as_ref(),
            "2".as_ref(),
            "-frames:v".as_ref(),
            count.as_ref(),
            pattern.as_os_str(),
        ];
        run(&self.ffmpeg, args)?;

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "jpg"))
            .collect();
        files.sort();
        let frames = files
            .iter()
            .take(max_count)
            .map(std::fs::read)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::debug!(frames = frames.len(), interval, "extracted video frames");
        Ok(frames)
    }

    fn trim(&self, video: &Path, start: f64, end: f64, output: &Path) -> Result<PathBuf, MediaError> {
        if !video.exists() {
            return Err(MediaError::NotFound(video.display().to_string()));
        }
        if !(start >= 0.0 && end > start) {
            return Err(MediaError::InvalidRange { start, end });
        }
        let start_arg = format!("{start:.3}");
        let length_arg = format!("{:.3}", end - start);
        let args: [&OsStr; 12] = [
            "-v".as_ref(),
            "error".as_ref(),
            "-y".as_ref(),
            "-ss".as_ref(),
            start_arg.as_ref(),
            "-i".as_ref(),
            video.as_os_str(),
            "-t".as_ref(),
            length_arg.as_ref(),
            "-c".as_ref(),
            "copy".as_ref(),
            output.as_os_str(),
        ];
        run(&self.ffmpeg, args)?;
        Ok(output.to_path_buf())
    }

    fn duration(&self, video: &Path) -> Option<f64> {
        match self.probe(video, "format=duration") {
            Ok(probe) => probe
                .format
                .and_then(|f| f.duration)
                .and_then(|d| d.parse().ok()),
            Err(err) => {
                tracing::debug!(error = %err, "could not read video duration");
                None
            }
        }
    }
}

fn run<I, S>(tool: &Path, args: I) -> Result<Vec<u8>, MediaError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = tool.display().to_string();
    let output = Command::new(tool).args(args).output().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            MediaError::ToolMissing(name.clone())
        } else {
            MediaError::Io(err)
        }
    })?;
    if !output.status.success() {
        return Err(MediaError::ToolFailed {
            tool: name,
            message: preview(&String::from_utf8_lossy(&output.stderr)),
        });
    }
    Ok(output.stdout)
}

/// `"30000/1001"` or `"25"`.
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let fps = match rate.split_once('/') {
        Some((num, den)) => {
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num.trim().parse::<f64>().ok()? / den
        }
        None => rate.trim().parse().ok()?,
    };
    (fps > 0.0).then_some(fps)
}

fn frame_interval(total_frames: usize, samples: usize) -> usize {
    if samples == 0 || total_frames <= samples {
        1
    } else {
        (total_frames / samples).max(1)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}
