//! Raw `sqlx::FromRow` row shapes and their conversion into domain models.
//!
//! sqlx's sqlite driver has no native enum/uuid/rfc3339 support, so every
//! repository selects into one of these flat string-typed rows first and
//! then parses; this mirrors the teacher's `vclip-firestore` document decode
//! step (parse-on-read, never trust the column type alone).

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use segforge_models::{
    ids::{JobId, ProjectId},
    job::{Job, JobStatus, JobType},
    project::{Pacing, Project},
    segment::{Segment, SegmentStatus},
};

use crate::error::DbError;

fn parse_dt(s: &str) -> Result<DateTime<Utc>, DbError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

#[derive(Debug, FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub user_prompt: String,
    pub pacing: String,
    pub total_duration_seconds: i64,
    pub segment_duration: i64,
    pub full_script: Option<String>,
    pub canon_summaries: String,
    pub current_segment_index: i64,
    pub last_frame_path: Option<String>,
    pub final_video_path: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ProjectRow {
    pub fn into_model(self) -> Result<Project, DbError> {
        Ok(Project {
            id: ProjectId::parse(&self.id)?,
            user_prompt: self.user_prompt,
            pacing: self.pacing.parse::<Pacing>().map_err(DbError::Decode)?,
            total_duration_seconds: self.total_duration_seconds,
            segment_duration: self.segment_duration,
            full_script: self.full_script,
            canon_summaries: self.canon_summaries,
            current_segment_index: self.current_segment_index,
            last_frame_path: self.last_frame_path,
            final_video_path: self.final_video_path,
            created_at: parse_dt(&self.created_at)?,
            updated_at: parse_dt(&self.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct SegmentRow {
    pub project_id: String,
    pub idx: i64,
    pub segment_script: String,
    pub video_prompt: String,
    pub video_path: Option<String>,
    pub video_description: Option<String>,
    pub last_frame_path: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl SegmentRow {
    pub fn into_model(self) -> Result<Segment, DbError> {
        Ok(Segment {
            project_id: ProjectId::parse(&self.project_id)?,
            index: self.idx,
            segment_script: self.segment_script,
            video_prompt: self.video_prompt,
            video_path: self.video_path,
            video_description: self.video_description,
            last_frame_path: self.last_frame_path,
            status: self.status.parse::<SegmentStatus>().map_err(DbError::Decode)?,
            created_at: parse_dt(&self.created_at)?,
            updated_at: parse_dt(&self.updated_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: String,
    pub project_id: String,
    pub job_type: String,
    pub status: String,
    pub progress: i64,
    pub message: String,
    pub error: Option<String>,
    pub payload: String,
    pub result: String,
    pub created_at: String,
    pub updated_at: String,
}

impl JobRow {
    pub fn into_model(self) -> Result<Job, DbError> {
        Ok(Job {
            id: JobId::parse(&self.id)?,
            project_id: ProjectId::parse(&self.project_id)?,
            job_type: self.job_type.parse::<JobType>().map_err(DbError::Decode)?,
            status: self.status.parse::<JobStatus>().map_err(DbError::Decode)?,
            progress: self.progress as i32,
            message: self.message,
            error: self.error,
            payload: serde_json::from_str::<Value>(&self.payload).unwrap_or_else(|_| Value::Object(Default::default())),
            result: serde_json::from_str::<Value>(&self.result).unwrap_or_else(|_| Value::Object(Default::default())),
            created_at: parse_dt(&self.created_at)?,
            updated_at: parse_dt(&self.updated_at)?,
        })
    }
}
