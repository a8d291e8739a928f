//! Per-project directory tree and atomic text writes.
//!
//! Grounded on `original_source/src/autosedance/server/storage.py`. The
//! original additionally offers a short-id frame-naming scheme
//! (`p<short8>_<NNN+1>.ext`); SPEC_FULL.md §9 resolves this Open Question in
//! favor of the simpler legacy scheme (`frame_<NNN>.jpg`), which is what this
//! module implements.

use std::path::{Path, PathBuf};

use segforge_models::ProjectId;
use tokio::fs;

use crate::error::StorageResult;

const VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".m4v", ".mkv", ".webm", ".avi"];

/// Resolves canonical paths under a single project's directory tree and
/// performs atomic text writes within it.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    /// `root` is the project's own directory (`<projects_root>/<project_id>`),
    /// already resolved by the caller from `PROJECTS_DIR`/`OUTPUT_DIR`.
    pub fn new(projects_root: impl AsRef<Path>, project_id: ProjectId) -> Self {
        Self {
            root: projects_root.as_ref().join(project_id.as_str()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the fixed subdirectory tree (`segments/`, `input_videos/`,
    /// `frames/`, `final/`) if it does not already exist.
    pub async fn ensure_dirs(&self) -> StorageResult<()> {
        for sub in ["segments", "input_videos", "frames", "final"] {
            fs::create_dir_all(self.root.join(sub)).await?;
        }
        Ok(())
    }

    pub fn full_script_path(&self) -> PathBuf {
        self.root.join("full_script.txt")
    }

    pub fn segment_txt_path(&self, index: i64) -> PathBuf {
        self.root.join("segments").join(format!("segment_{index:03}.txt"))
    }

    /// Extension is the lowercased extension of the upload when it is one of
    /// the allowed video extensions, else `.mp4`.
    pub fn input_video_path(&self, index: i64, original_filename: Option<&str>) -> PathBuf {
        let ext = original_filename
            .and_then(|f| Path::new(f).extension())
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .filter(|e| VIDEO_EXTENSIONS.contains(&e.as_str()))
            .unwrap_or_else(|| ".mp4".to_string());
        self.root
            .join("input_videos")
            .join(format!("segment_{index:03}{ext}"))
    }

    pub fn frame_path(&self, index: i64) -> PathBuf {
        self.root.join("frames").join(format!("frame_{index:03}.jpg"))
    }

    pub fn final_video_path(&self) -> PathBuf {
        self.root.join("final").join("output.mp4")
    }

    /// Write `content` to `path` atomically: write to a sibling temp file,
    /// then rename over the target. Cleans up the temp file if the rename
    /// (or the write) fails.
    pub async fn atomic_write_text(path: impl AsRef<Path>, content: &str) -> StorageResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_name = format!(
            ".{}.tmp-{}",
            path.file_name().and_then(|n| n.to_str()).unwrap_or("write"),
            uuid_like_suffix()
        );
        let tmp_path = path.with_file_name(tmp_name);

        let result = async {
            fs::write(&tmp_path, content.as_bytes()).await?;
            fs::rename(&tmp_path, path).await?;
            Ok::<(), std::io::Error>(())
        }
        .await;

        if result.is_err() {
            let _ = fs::remove_file(&tmp_path).await;
        }

        result.map_err(Into::into)
    }
}

/// A short random suffix for temp filenames, avoiding collisions between
/// concurrent writers without pulling in a UUID dependency for one call site.
fn uuid_like_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{nanos:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn layout_paths_are_stable() {
        let dir = TempDir::new().unwrap();
        let pid = ProjectId::new();
        let layout = ProjectLayout::new(dir.path(), pid);

        layout.ensure_dirs().await.unwrap();
        assert!(layout.root().join("segments").is_dir());
        assert!(layout.root().join("input_videos").is_dir());
        assert!(layout.root().join("frames").is_dir());
        assert!(layout.root().join("final").is_dir());

        assert_eq!(
            layout.segment_txt_path(3).file_name().unwrap(),
            "segment_003.txt"
        );
        assert_eq!(layout.frame_path(7).file_name().unwrap(), "frame_007.jpg");
        assert_eq!(
            layout.input_video_path(1, Some("clip.MOV")).file_name().unwrap(),
            "segment_001.mov"
        );
        assert_eq!(
            layout.input_video_path(2, Some("clip.xyz")).file_name().unwrap(),
            "segment_002.mp4"
        );
        assert_eq!(
            layout.input_video_path(2, None).file_name().unwrap(),
            "segment_002.mp4"
        );
    }

    #[tokio::test]
    async fn atomic_write_text_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("full_script.txt");

        ProjectLayout::atomic_write_text(&path, "first").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "first");

        ProjectLayout::atomic_write_text(&path, "second").await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "second");

        let leftover_tmp: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftover_tmp.is_empty());
    }
}
