//! Job entity, its status/type enums, and the localization-ready `ui_message`.
//!
//! Grounded on `original_source/src/autosedance/server/models.py::Job` and
//! `server/worker.py::_ui_message`.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{JobId, ProjectId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullScript,
    SegmentGenerate,
    ExtractFrame,
    Analyze,
    Assemble,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobType::FullScript => "full_script",
            JobType::SegmentGenerate => "segment_generate",
            JobType::ExtractFrame => "extract_frame",
            JobType::Analyze => "analyze",
            JobType::Assemble => "assemble",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full_script" => Ok(JobType::FullScript),
            "segment_generate" => Ok(JobType::SegmentGenerate),
            "extract_frame" => Ok(JobType::ExtractFrame),
            "analyze" => Ok(JobType::Analyze),
            "assemble" => Ok(JobType::Assemble),
            other => Err(format!("unknown job type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            "canceled" => Ok(JobStatus::Canceled),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// A persisted, asynchronously-executed unit of pipeline work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub project_id: ProjectId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: i32,
    pub message: String,
    pub error: Option<String>,
    pub payload: Value,
    pub result: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// `{"ui_message": {"key": ..., "params": ...}}` — merged into `Job::result`, never
/// overwriting sibling keys a handler has already placed there (see
/// `original_source/.../server/worker.py::_set_job`'s merge-not-replace semantics).
pub fn ui_message(key: &str, params: Option<Value>) -> Value {
    let mut obj = serde_json::Map::new();
    obj.insert("key".to_string(), Value::String(key.to_string()));
    if let Some(p) = params {
        obj.insert("params".to_string(), p);
    }
    serde_json::json!({ "ui_message": Value::Object(obj) })
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobOut {
    pub id: String,
    pub project_id: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    #[serde(default)]
    pub progress: i32,
    #[serde(default)]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub result: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateJobIn {
    #[serde(rename = "type")]
    pub job_type: JobType,
    #[serde(default)]
    pub index: Option<i64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub locale: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_message_omits_params_when_absent() {
        let v = ui_message("jobmsg.queued", None);
        assert_eq!(v["ui_message"]["key"], "jobmsg.queued");
        assert!(v["ui_message"].get("params").is_none());
    }

    #[test]
    fn ui_message_includes_params_when_present() {
        let v = ui_message("jobmsg.segment.calling_llm", Some(serde_json::json!({"n": "003"})));
        assert_eq!(v["ui_message"]["params"]["n"], "003");
    }
}
