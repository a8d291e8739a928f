//! The pure next-action rule table.
//!
//! Grounded on `original_source/.../server/utils.py::derive_next_action`;
//! reimplemented as an ordered `match` rather than the original's chain of
//! `if` returns, same rule order and semantics (SPEC_FULL.md §4.5).

use segforge_models::job::Job;
use segforge_models::project::{NextAction, Project};
use segforge_models::segment::{Segment, SegmentStatus};

/// Derive the single next recommended action for a project from its current
/// segment rows. `segments` need not be sorted or contiguous; the segment at
/// the project's cursor is looked up by index, and a missing row is treated
/// the same as a `pending` one.
pub fn derive_next_action(project: &Project, segments: &[Segment]) -> NextAction {
    let total = project.num_segments();
    let cursor = project.current_segment_index;

    if project.full_script.as_deref().map(str::is_empty).unwrap_or(true) {
        return NextAction::GenerateFullScript;
    }

    if cursor >= total {
        return if project.final_video_path.is_some() {
            NextAction::Done
        } else {
            NextAction::Assemble
        };
    }

    let current = segments.iter().find(|s| s.index == cursor);

    match current {
        None => NextAction::GenerateSegment,
        Some(seg) => match seg.status {
            SegmentStatus::Pending => NextAction::GenerateSegment,
            SegmentStatus::ScriptReady => {
                if seg.video_path.is_none() {
                    NextAction::UploadVideo
                } else {
                    NextAction::Analyze
                }
            }
            SegmentStatus::WaitingVideo => {
                if seg.video_path.is_some() {
                    NextAction::Analyze
                } else {
                    NextAction::UploadVideo
                }
            }
            SegmentStatus::Analyzing => NextAction::WaitAnalyze,
            SegmentStatus::Completed => NextAction::GenerateSegment,
            SegmentStatus::Failed => NextAction::Retry,
        },
    }
}

/// Whether a project has a job currently running — used by route handlers to
/// reject a new job submission while one is in flight, per SPEC_FULL.md
/// §4.6's at-most-one-running-job-per-project invariant.
pub fn has_running_job(jobs: &[Job]) -> bool {
    jobs.iter().any(|j| j.status == segforge_models::job::JobStatus::Running)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use segforge_models::ids::ProjectId;
    use segforge_models::project::Pacing;

    use super::*;

    fn project(full_script: Option<&str>, cursor: i64, final_video: Option<&str>) -> Project {
        Project {
            id: ProjectId::new(),
            user_prompt: "p".into(),
            pacing: Pacing::Normal,
            total_duration_seconds: 30,
            segment_duration: 15,
            full_script: full_script.map(String::from),
            canon_summaries: String::new(),
            current_segment_index: cursor,
            last_frame_path: None,
            final_video_path: final_video.map(String::from),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn segment(index: i64, status: SegmentStatus, has_video: bool) -> Segment {
        let mut s = Segment::new(ProjectId::new(), index);
        s.status = status;
        if has_video {
            s.video_path = Some("video.mp4".into());
        }
        s
    }

    #[test]
    fn empty_full_script_wins_first() {
        let p = project(None, 0, None);
        assert_eq!(derive_next_action(&p, &[]), NextAction::GenerateFullScript);
    }

    #[test]
    fn cursor_past_total_without_final_video_assembles() {
        let p = project(Some("script"), 2, None);
        assert_eq!(derive_next_action(&p, &[]), NextAction::Assemble);
    }

    #[test]
    fn cursor_past_total_with_final_video_is_done() {
        let p = project(Some("script"), 2, Some("final.mp4"));
        assert_eq!(derive_next_action(&p, &[]), NextAction::Done);
    }

    #[test]
    fn missing_segment_at_cursor_generates() {
        let p = project(Some("script"), 0, None);
        assert_eq!(derive_next_action(&p, &[]), NextAction::GenerateSegment);
    }

    #[test]
    fn script_ready_without_video_uploads() {
        let p = project(Some("script"), 0, None);
        let seg = segment(0, SegmentStatus::ScriptReady, false);
        assert_eq!(derive_next_action(&p, &[seg]), NextAction::UploadVideo);
    }

    #[test]
    fn script_ready_with_video_analyzes() {
        let p = project(Some("script"), 0, None);
        let seg = segment(0, SegmentStatus::ScriptReady, true);
        assert_eq!(derive_next_action(&p, &[seg]), NextAction::Analyze);
    }

    #[test]
    fn waiting_video_without_video_uploads() {
        let p = project(Some("script"), 0, None);
        let seg = segment(0, SegmentStatus::WaitingVideo, false);
        assert_eq!(derive_next_action(&p, &[seg]), NextAction::UploadVideo);
    }

    #[test]
    fn waiting_video_with_video_analyzes() {
        let p = project(Some("script"), 0, None);
        let seg = segment(0, SegmentStatus::WaitingVideo, true);
        assert_eq!(derive_next_action(&p, &[seg]), NextAction::Analyze);
    }

    #[test]
    fn analyzing_waits() {
        let p = project(Some("script"), 0, None);
        let seg = segment(0, SegmentStatus::Analyzing, true);
        assert_eq!(derive_next_action(&p, &[seg]), NextAction::WaitAnalyze);
    }

    #[test]
    fn completed_advances_to_next_segment() {
        let p = project(Some("script"), 0, None);
        let seg = segment(0, SegmentStatus::Completed, true);
        assert_eq!(derive_next_action(&p, &[seg]), NextAction::GenerateSegment);
    }

    #[test]
    fn failed_retries() {
        let p = project(Some("script"), 0, None);
        let seg = segment(0, SegmentStatus::Failed, false);
        assert_eq!(derive_next_action(&p, &[seg]), NextAction::Retry);
    }
}
