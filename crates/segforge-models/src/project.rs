//! Project entity and its DTOs.
//!
//! Field set grounded on `original_source/src/autosedance/server/models.py::Project`
//! and `schemas.py::{ProjectSummaryOut, ProjectDetailOut}`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::ProjectId;
use crate::segment::SegmentSummaryOut;

/// Pacing hint passed to the screenplay LLM call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    Normal,
    Slow,
    Urgent,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing::Normal
    }
}

impl std::fmt::Display for Pacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Pacing::Normal => "normal",
            Pacing::Slow => "slow",
            Pacing::Urgent => "urgent",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Pacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Pacing::Normal),
            "slow" => Ok(Pacing::Slow),
            "urgent" => Ok(Pacing::Urgent),
            other => Err(format!("unknown pacing: {other}")),
        }
    }
}

/// The pipeline's next recommended action, derived purely from project/segment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    GenerateFullScript,
    GenerateSegment,
    UploadVideo,
    Analyze,
    WaitAnalyze,
    Retry,
    Assemble,
    Done,
    Unknown,
}

/// A production project: one target video assembled from sequential segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub user_prompt: String,
    pub pacing: Pacing,
    pub total_duration_seconds: i64,
    pub segment_duration: i64,
    pub full_script: Option<String>,
    pub canon_summaries: String,
    pub current_segment_index: i64,
    pub last_frame_path: Option<String>,
    pub final_video_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// `⌈total_duration_seconds / segment_duration⌉` — see SPEC_FULL.md §4.5.
    pub fn num_segments(&self) -> i64 {
        (self.total_duration_seconds + self.segment_duration - 1) / self.segment_duration
    }

    /// `(start, end)` seconds covered by segment `index`, clamped to the project's total.
    pub fn time_range(&self, index: i64) -> (i64, i64) {
        let start = index * self.segment_duration;
        let end = ((index + 1) * self.segment_duration).min(self.total_duration_seconds);
        (start, end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectSummaryOut {
    pub id: String,
    pub user_prompt: String,
    pub pacing: Pacing,
    pub total_duration_seconds: i64,
    pub segment_duration: i64,
    #[serde(default)]
    pub current_segment_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub num_segments: i64,
    pub next_action: NextAction,
    #[serde(default)]
    pub segments_completed: i64,
    #[serde(default)]
    pub segments_with_video: i64,
    #[serde(default)]
    pub segments_with_frame: i64,
    #[serde(default)]
    pub segments_with_description: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProjectDetailOut {
    pub id: String,
    pub user_prompt: String,
    pub pacing: Pacing,
    pub total_duration_seconds: i64,
    pub segment_duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_script: Option<String>,
    #[serde(default)]
    pub canon_summaries: String,
    #[serde(default)]
    pub current_segment_index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_frame_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_video_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub num_segments: i64,
    pub next_action: NextAction,
    pub segments: Vec<SegmentSummaryOut>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateProjectIn {
    pub user_prompt: String,
    pub total_duration_seconds: i64,
    #[serde(default = "default_segment_duration")]
    pub segment_duration: i64,
    #[serde(default)]
    pub pacing: Pacing,
}

fn default_segment_duration() -> i64 {
    15
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateFullScriptIn {
    pub full_script: String,
    #[serde(default = "default_true")]
    pub invalidate_downstream: bool,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateWithFeedbackIn {
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

pub(crate) fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(total: i64, seg: i64) -> Project {
        Project {
            id: ProjectId::new(),
            user_prompt: "p".into(),
            pacing: Pacing::Normal,
            total_duration_seconds: total,
            segment_duration: seg,
            full_script: None,
            canon_summaries: String::new(),
            current_segment_index: 0,
            last_frame_path: None,
            final_video_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn num_segments_rounds_up() {
        assert_eq!(project(30, 15).num_segments(), 2);
        assert_eq!(project(31, 15).num_segments(), 3);
        assert_eq!(project(1, 15).num_segments(), 1);
    }

    #[test]
    fn time_range_clamps_last_segment() {
        let p = project(31, 15);
        assert_eq!(p.time_range(0), (0, 15));
        assert_eq!(p.time_range(1), (15, 30));
        assert_eq!(p.time_range(2), (30, 31));
    }
}
