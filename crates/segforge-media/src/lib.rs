//! Media Toolkit: last-frame extraction and segment concatenation over the
//! system `ffmpeg`/`ffprobe` binaries, invoked as async subprocesses so the
//! worker's poll loop never blocks a thread for the duration of an encode.

pub mod command;
pub mod concat;
pub mod error;
pub mod frame;
pub mod probe;
pub mod progress;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::{concatenate_videos, ConcatMode};
pub use error::{MediaError, MediaResult};
pub use frame::extract_last_frame;
pub use probe::{probe_concat_info, probe_duration_seconds, ConcatProbeInfo};
pub use progress::FfmpegProgress;
