//! Last-frame extraction: a fast end-of-file seek, falling back to a
//! duration-probed seek when the fast path can't decode near EOF (common
//! with some containers/codecs).

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_duration_seconds;

const EXTRACT_TIMEOUT_SECS: u64 = 30;

/// Extract the last frame of `video` into `out` (a `.jpg` path). Any stale
/// file at `out` is removed first so a failed attempt never leaves a
/// previous run's frame behind.
pub async fn extract_last_frame(video: impl AsRef<Path>, out: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let video = video.as_ref();
    let out = out.as_ref();

    if let Some(parent) = out.parent() {
        fs::create_dir_all(parent).await?;
    }
    let _ = fs::remove_file(out).await;

    let runner = FfmpegRunner::new().with_timeout(EXTRACT_TIMEOUT_SECS);

    let fast = FfmpegCommand::new(video, out)
        .input_arg("-sseof")
        .input_arg("-0.5")
        .single_frame();

    if runner.run(&fast).await.is_ok() && out.exists() {
        return Ok(out.to_path_buf());
    }

    let duration = probe_duration_seconds(video).await.unwrap_or(0.0);
    let seek = (duration - 0.5).max(0.0);

    let fallback = FfmpegCommand::new(video, out).seek(seek).single_frame();
    runner
        .run(&fallback)
        .await
        .map_err(|e| MediaError::FrameExtraction(e.to_string()))?;

    if !out.exists() {
        return Err(MediaError::FrameExtraction(
            "ffmpeg reported success but produced no output file".to_string(),
        ));
    }
    Ok(out.to_path_buf())
}
