//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::FfmpegProgress;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: Option<PathBuf>,
    output: PathBuf,
    input_args: Vec<String>,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: Some(input.as_ref().to_path_buf()),
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// A command with no `-i` of its own (the input is supplied entirely via
    /// `input_args`, e.g. `-f concat -safe 0 -i list.txt`).
    pub fn without_input(output: impl AsRef<Path>) -> Self {
        Self {
            input: None,
            output: output.as_ref().to_path_buf(),
            input_args: Vec::new(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.input_args.push(arg.into());
        self
    }

    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn seek(self, seconds: f64) -> Self {
        self.input_arg("-ss").input_arg(format!("{seconds:.3}"))
    }

    pub fn single_frame(self) -> Self {
        self.output_arg("-vframes").output_arg("1")
    }

    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-hide_banner".to_string()];

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-loglevel".to_string());
        args.push(self.log_level.clone());
        args.push("-nostdin".to_string());

        args.extend(self.input_args.clone());

        if let Some(input) = &self.input {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands, with progress parsing and a wall-clock limit.
pub struct FfmpegRunner {
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self { timeout_secs: None }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    pub async fn run_with_progress<F>(&self, cmd: &FfmpegCommand, progress_callback: F) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let mut args = vec!["-progress".to_string(), "pipe:2".to_string()];
        args.extend(cmd.build_args());
        debug!("running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        let stderr = child.stderr.take().expect("stderr not captured");
        let mut reader = BufReader::new(stderr).lines();

        let progress_handle = tokio::spawn(async move {
            let mut current = FfmpegProgress::default();
            while let Ok(Some(line)) = reader.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut current) {
                    progress_callback(progress);
                }
            }
        });

        let result = self.wait_for_completion(&mut child).await;
        let _ = progress_handle.await;
        result
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<()> {
        let status = if let Some(timeout_secs) = self.timeout_secs {
            match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), child.wait()).await {
                Ok(status) => status?,
                Err(_) => {
                    warn!("ffmpeg timed out after {timeout_secs}s, killing process");
                    let _ = child.kill().await;
                    return Err(MediaError::Timeout(timeout_secs));
                }
            }
        } else {
            child.wait().await?
        };

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::ffmpeg_failed(
                "ffmpeg exited with non-zero status",
                None,
                status.code(),
            ))
        }
    }
}

fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> Option<FfmpegProgress> {
    let line = line.trim();
    let (key, value) = line.split_once('=')?;

    match key {
        "out_time_ms" | "out_time_us" => {
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = if key == "out_time_us" { us / 1000 } else { us };
            }
        }
        "out_time" => current.out_time = value.to_string(),
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if value != "N/A" {
                if let Some(speed) = value.strip_suffix('x').and_then(|s| s.parse().ok()) {
                    current.speed = speed;
                }
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

/// Run a fully-formed ffmpeg invocation. Used when the argument shape does
/// not fit the single-input `FfmpegCommand` builder, e.g. multi-input
/// `filter_complex` graphs with N `-i` flags.
pub async fn run_ffmpeg_args(args: &[String], timeout_secs: u64) -> MediaResult<()> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let mut child = Command::new("ffmpeg")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;

    let stderr = child.stderr.take();

    let status = match tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), child.wait()).await {
        Ok(status) => status?,
        Err(_) => {
            warn!("ffmpeg timed out after {timeout_secs}s, killing process");
            let _ = child.kill().await;
            return Err(MediaError::Timeout(timeout_secs));
        }
    };

    if status.success() {
        return Ok(());
    }

    let mut message = String::new();
    if let Some(mut stderr) = stderr {
        use tokio::io::AsyncReadExt;
        let _ = stderr.read_to_string(&mut message).await;
    }
    Err(MediaError::ffmpeg_failed(
        "ffmpeg exited with non-zero status",
        Some(message),
        status.code(),
    ))
}

/// Check FFmpeg is on `PATH`.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check FFprobe is on `PATH`.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_builder_includes_seek_and_single_frame() {
        let cmd = FfmpegCommand::new("input.mp4", "out.jpg")
            .seek(10.5)
            .single_frame();
        let args = cmd.build_args();
        assert!(args.contains(&"-ss".to_string()));
        assert!(args.contains(&"10.500".to_string()));
        assert!(args.contains(&"-vframes".to_string()));
    }

    #[test]
    fn command_without_input_omits_dash_i() {
        let cmd = FfmpegCommand::without_input("out.mp4")
            .input_args(["-f", "concat", "-safe", "0", "-i", "list.txt"]);
        let args = cmd.build_args();
        assert_eq!(args.iter().filter(|a| a.as_str() == "-i").count(), 1);
    }

    #[test]
    fn progress_parsing_marks_completion() {
        let mut progress = FfmpegProgress::default();
        parse_progress_line("out_time_ms=5000000", &mut progress);
        assert_eq!(progress.out_time_ms, 5000000);

        let result = parse_progress_line("progress=end", &mut progress);
        assert!(result.is_some());
        assert!(progress.is_complete);
    }
}
