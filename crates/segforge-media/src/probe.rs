//! FFprobe inspection: plain duration probing plus the richer per-stream
//! probe concatenation needs (video/audio duration, codec, sample rate).

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u32>,
}

/// Per-stream probe information needed by the concat algorithm: format
/// duration plus, when present, the video and first audio stream's duration,
/// the video codec, and the audio sample rate/channel count.
#[derive(Debug, Clone, Default)]
pub struct ConcatProbeInfo {
    pub format_duration: f64,
    pub video_duration: Option<f64>,
    pub video_codec: Option<String>,
    pub audio_duration: Option<f64>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
}

impl ConcatProbeInfo {
    pub fn has_audio(&self) -> bool {
        self.audio_duration.is_some()
    }

    /// The first positive of (video duration, format duration, audio
    /// duration) — this input's contribution to the expected concat total.
    pub fn effective_duration(&self) -> f64 {
        for candidate in [self.video_duration, Some(self.format_duration), self.audio_duration] {
            if let Some(d) = candidate {
                if d > 0.0 {
                    return d;
                }
            }
        }
        0.0
    }
}

/// Probe a video file for the fields the concat algorithm needs.
pub async fn probe_concat_info(path: impl AsRef<Path>) -> MediaResult<ConcatProbeInfo> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "ffprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    let format_duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let audio = probe.streams.iter().find(|s| s.codec_type == "audio");

    Ok(ConcatProbeInfo {
        format_duration,
        video_duration: video.and_then(|s| s.duration.as_deref()).and_then(|d| d.parse().ok()),
        video_codec: video.and_then(|s| s.codec_name.clone()),
        audio_duration: audio.and_then(|s| s.duration.as_deref()).and_then(|d| d.parse().ok()),
        audio_sample_rate: audio
            .and_then(|s| s.sample_rate.as_deref())
            .and_then(|r| r.parse().ok()),
        audio_channels: audio.and_then(|s| s.channels),
    })
}

/// Probe just the container duration in seconds, via
/// `-show_entries format=duration`. Used by the last-frame extraction
/// fallback path, which does not need the full per-stream probe.
pub async fn probe_duration_seconds(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "ffprobe duration probe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    String::from_utf8_lossy(&output.stdout)
        .trim()
        .parse::<f64>()
        .map_err(|_| MediaError::InvalidVideo("could not parse duration".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_duration_prefers_video_then_format_then_audio() {
        let info = ConcatProbeInfo {
            format_duration: 10.0,
            video_duration: Some(12.0),
            audio_duration: Some(9.0),
            ..Default::default()
        };
        assert_eq!(info.effective_duration(), 12.0);

        let info = ConcatProbeInfo {
            format_duration: 10.0,
            video_duration: None,
            audio_duration: Some(9.0),
            ..Default::default()
        };
        assert_eq!(info.effective_duration(), 10.0);

        let info = ConcatProbeInfo {
            format_duration: 0.0,
            video_duration: None,
            audio_duration: Some(9.0),
            ..Default::default()
        };
        assert_eq!(info.effective_duration(), 9.0);
    }
}
