//! Domain model -> response DTO conversion.
//!
//! Grounded on `original_source/.../server/routes/common.py`
//! (`segment_to_out`/`project_to_out`): segments are sorted by index, and a
//! segment's `video_url`/`frame_url` are only populated once the underlying
//! file exists.

use segforge_models::job::JobOut;
use segforge_models::project::{ProjectDetailOut, ProjectSummaryOut};
use segforge_models::segment::{SegmentDetailOut, SegmentSummaryOut};
use segforge_models::{Job, Project, Segment};

use segforge_queue::derive_next_action;

fn video_url(project_id: &str, index: i64) -> String {
    format!("/api/projects/{project_id}/segments/{index}/video")
}

fn frame_url(project_id: &str, index: i64) -> String {
    format!("/api/projects/{project_id}/segments/{index}/frame")
}

pub fn segment_summary(project_id: &str, segment: &Segment) -> SegmentSummaryOut {
    SegmentSummaryOut {
        index: segment.index,
        status: segment.status,
        has_video: segment.video_path.is_some(),
        has_frame: segment.last_frame_path.is_some(),
        has_description: segment.video_description.is_some(),
        updated_at: segment.updated_at,
        video_url: segment.video_path.is_some().then(|| video_url(project_id, segment.index)),
        frame_url: segment.last_frame_path.is_some().then(|| frame_url(project_id, segment.index)),
    }
}

pub fn segment_detail(project_id: &str, segment: &Segment, warnings: Vec<String>) -> SegmentDetailOut {
    SegmentDetailOut {
        index: segment.index,
        segment_script: segment.segment_script.clone(),
        video_prompt: segment.video_prompt.clone(),
        status: segment.status,
        video_description: segment.video_description.clone(),
        warnings,
        video_path: segment.video_path.clone(),
        last_frame_path: segment.last_frame_path.clone(),
        video_url: segment.video_path.is_some().then(|| video_url(project_id, segment.index)),
        frame_url: segment.last_frame_path.is_some().then(|| frame_url(project_id, segment.index)),
        created_at: segment.created_at,
        updated_at: segment.updated_at,
    }
}

/// Synthetic default detail for a segment index that has no row yet — the
/// original returns `status="pending"` with everything else empty so the
/// frontend can render a placeholder card (`routes/segments.py::
/// get_segment_detail`).
pub fn synthetic_segment_detail(index: i64, project: &Project) -> SegmentDetailOut {
    SegmentDetailOut {
        index,
        segment_script: String::new(),
        video_prompt: String::new(),
        status: segforge_models::segment::SegmentStatus::Pending,
        video_description: None,
        warnings: Vec::new(),
        video_path: None,
        last_frame_path: None,
        video_url: None,
        frame_url: None,
        created_at: project.created_at,
        updated_at: project.updated_at,
    }
}

pub fn project_detail(project: &Project, segments: &[Segment]) -> ProjectDetailOut {
    let mut sorted = segments.to_vec();
    sorted.sort_by_key(|s| s.index);
    let project_id = project.id.as_str();

    ProjectDetailOut {
        id: project_id.clone(),
        user_prompt: project.user_prompt.clone(),
        pacing: project.pacing,
        total_duration_seconds: project.total_duration_seconds,
        segment_duration: project.segment_duration,
        full_script: project.full_script.clone(),
        canon_summaries: project.canon_summaries.clone(),
        current_segment_index: project.current_segment_index,
        last_frame_path: project.last_frame_path.clone(),
        final_video_path: project.final_video_path.clone(),
        created_at: project.created_at,
        updated_at: project.updated_at,
        num_segments: project.num_segments(),
        next_action: derive_next_action(project, &sorted),
        segments: sorted.iter().map(|s| segment_summary(&project_id, s)).collect(),
    }
}

pub fn project_summary(project: &Project, segments: &[Segment]) -> ProjectSummaryOut {
    let completed = segments.iter().filter(|s| s.status == segforge_models::segment::SegmentStatus::Completed).count();
    let with_video = segments.iter().filter(|s| s.video_path.is_some()).count();
    let with_frame = segments.iter().filter(|s| s.last_frame_path.is_some()).count();
    let with_description = segments.iter().filter(|s| s.video_description.is_some()).count();

    ProjectSummaryOut {
        id: project.id.as_str(),
        user_prompt: project.user_prompt.clone(),
        pacing: project.pacing,
        total_duration_seconds: project.total_duration_seconds,
        segment_duration: project.segment_duration,
        current_segment_index: project.current_segment_index,
        created_at: project.created_at,
        updated_at: project.updated_at,
        num_segments: project.num_segments(),
        next_action: derive_next_action(project, segments),
        segments_completed: completed as i64,
        segments_with_video: with_video as i64,
        segments_with_frame: with_frame as i64,
        segments_with_description: with_description as i64,
    }
}

pub fn job_out(job: &Job) -> JobOut {
    JobOut {
        id: job.id.as_str(),
        project_id: job.project_id.as_str(),
        job_type: job.job_type,
        status: job.status,
        progress: job.progress,
        message: job.message.clone(),
        error: job.error.clone(),
        payload: job.payload.clone(),
        result: job.result.clone(),
        created_at: job.created_at,
        updated_at: job.updated_at,
    }
}
