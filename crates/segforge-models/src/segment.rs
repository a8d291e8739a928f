//! Segment entity and its DTOs.
//!
//! Grounded on `original_source/src/autosedance/server/models.py::Segment` and
//! `state/schema.py::SegmentRecord` (status literal), plus `schemas.py`'s
//! `SegmentSummaryOut`/`SegmentDetailOut`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;
use crate::project::default_true;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    Pending,
    ScriptReady,
    WaitingVideo,
    Analyzing,
    Completed,
    Failed,
}

impl Default for SegmentStatus {
    fn default() -> Self {
        SegmentStatus::Pending
    }
}

impl std::fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SegmentStatus::Pending => "pending",
            SegmentStatus::ScriptReady => "script_ready",
            SegmentStatus::WaitingVideo => "waiting_video",
            SegmentStatus::Analyzing => "analyzing",
            SegmentStatus::Completed => "completed",
            SegmentStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SegmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SegmentStatus::Pending),
            "script_ready" => Ok(SegmentStatus::ScriptReady),
            "waiting_video" => Ok(SegmentStatus::WaitingVideo),
            "analyzing" => Ok(SegmentStatus::Analyzing),
            "completed" => Ok(SegmentStatus::Completed),
            "failed" => Ok(SegmentStatus::Failed),
            other => Err(format!("unknown segment status: {other}")),
        }
    }
}

/// A single fixed-duration slice of the target video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub project_id: ProjectId,
    pub index: i64,
    pub segment_script: String,
    pub video_prompt: String,
    pub video_path: Option<String>,
    pub video_description: Option<String>,
    pub last_frame_path: Option<String>,
    pub status: SegmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Segment {
    pub fn new(project_id: ProjectId, index: i64) -> Self {
        let now = Utc::now();
        Self {
            project_id,
            index,
            segment_script: String::new(),
            video_prompt: String::new(),
            video_path: None,
            video_description: None,
            last_frame_path: None,
            status: SegmentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentSummaryOut {
    pub index: i64,
    pub status: SegmentStatus,
    pub has_video: bool,
    pub has_frame: bool,
    pub has_description: bool,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SegmentDetailOut {
    pub index: i64,
    #[serde(default)]
    pub segment_script: String,
    #[serde(default)]
    pub video_prompt: String,
    pub status: SegmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_description: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateSegmentIn {
    #[serde(default)]
    pub segment_script: Option<String>,
    #[serde(default)]
    pub video_prompt: Option<String>,
    #[serde(default = "default_true")]
    pub invalidate_downstream: bool,
}
