use std::sync::Once;

use flipper_core::{
    update_quick, FileFormatInfo, FormatAnalysis, JobSnapshot, JobStatus, JobStep, Phase,
    QuickEffect, QuickMsg, QuickTranscodeState,
};
use uuid::Uuid;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(flipper_logging::initialize_for_tests);
}

fn info(id: Uuid) -> FileFormatInfo {
    FileFormatInfo {
        id,
        format_analysis: FormatAnalysis {
            stream_count: 2,
            program_count: 0,
            format_name: "mov,mp4,m4a,3gp,3g2,mj2".to_string(),
            format_long_name: "QuickTime / MOV".to_string(),
            start_time: 0.0,
            duration: 12.5,
            size: 1_048_576,
            bit_rate: 671_088.0,
            probe_score: 100,
        },
    }
}

/// Drives a fresh machine through job creation and upload.
fn polling(job_id: Uuid) -> QuickTranscodeState {
    let template_id = Uuid::new_v4();
    let (state, effects) = update_quick(
        QuickTranscodeState::new(),
        QuickMsg::BufferReceived {
            template_id,
            byte_len: 4096,
        },
    );
    assert_eq!(effects, vec![QuickEffect::CreateJob { template_id }]);
    assert_eq!(state.phase(), Phase::Uploading);

    let (state, effects) = update_quick(state, QuickMsg::JobCreated { job_id });
    assert_eq!(
        effects,
        vec![
            QuickEffect::StartTracking { job_id },
            QuickEffect::Upload { job_id }
        ]
    );
    let (state, effects) = update_quick(state, QuickMsg::UploadCompleted);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Polling);
    state
}

fn observed(state: QuickTranscodeState, snapshot: &JobSnapshot) -> (QuickTranscodeState, Vec<QuickEffect>) {
    update_quick(
        state,
        QuickMsg::JobObserved {
            status: snapshot.status,
            analysis_id: snapshot.analysis_result_id(),
        },
    )
}

fn snapshot_with(steps: Vec<JobStep>) -> JobSnapshot {
    JobSnapshot {
        status: JobStatus::Started,
        completed_steps: 0,
        steps,
        error_message: None,
    }
}

fn step(step_type: &str, analysis_result: Option<Uuid>) -> JobStep {
    JobStep {
        id: Uuid::new_v4(),
        step_type: step_type.to_string(),
        status: JobStatus::Started,
        analysis_result,
        error_message: None,
    }
}

#[test]
fn phases_only_move_forward() {
    init_logging();
    assert!(Phase::Idle < Phase::Uploading);
    assert!(Phase::Uploading < Phase::Polling);
    assert!(Phase::Polling < Phase::AnalysisReady);
    assert_eq!(Phase::AnalysisReady.ordinal(), 3);
}

#[test]
fn steps_without_analysis_never_reach_analysis_ready() {
    init_logging();
    let mut state = polling(Uuid::new_v4());
    let snapshot = snapshot_with(vec![step("thumbnail", None), step("transcode", None)]);
    for _ in 0..5 {
        let (next, effects) = observed(state, &snapshot);
        assert!(effects.is_empty());
        state = next;
    }
    assert_eq!(state.phase(), Phase::Polling);
}

#[test]
fn nil_analysis_id_is_ignored() {
    init_logging();
    let state = polling(Uuid::new_v4());
    let snapshot = snapshot_with(vec![step("analysis", Some(Uuid::nil()))]);
    let (state, effects) = observed(state, &snapshot);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Polling);
}

#[test]
fn new_analysis_id_fetches_once_then_transitions() {
    init_logging();
    let result_id = Uuid::new_v4();
    let state = polling(Uuid::new_v4());
    let snapshot = snapshot_with(vec![step("analysis", Some(result_id))]);

    let (state, effects) = observed(state, &snapshot);
    assert_eq!(effects, vec![QuickEffect::FetchAnalysis { result_id }]);
    let (state, effects) = observed(state, &snapshot);
    assert!(effects.is_empty(), "unchanged id must not refetch");

    let (state, _) = update_quick(
        state,
        QuickMsg::AnalysisLoaded {
            result_id,
            info: info(result_id),
        },
    );
    let view = state.view();
    assert_eq!(view.phase, Phase::AnalysisReady);
    assert_eq!(view.analysis, Some(info(result_id)));
    assert_eq!(view.job_status, Some(JobStatus::Started));
}

#[test]
fn unavailable_analysis_is_retried_on_next_observation() {
    init_logging();
    let result_id = Uuid::new_v4();
    let state = polling(Uuid::new_v4());
    let snapshot = snapshot_with(vec![step("analysis", Some(result_id))]);

    let (state, _) = observed(state, &snapshot);
    let (state, effects) = update_quick(state, QuickMsg::AnalysisUnavailable { result_id });
    assert!(effects.is_empty());
    assert_eq!(state.view().last_error, None);

    let (state, effects) = observed(state, &snapshot);
    assert_eq!(effects, vec![QuickEffect::FetchAnalysis { result_id }]);
    assert_eq!(state.phase(), Phase::Polling);
}

#[test]
fn failure_halts_progress_without_reverting_phase() {
    init_logging();
    let result_id = Uuid::new_v4();
    let state = polling(Uuid::new_v4());
    let (state, effects) = update_quick(
        state,
        QuickMsg::Failed {
            message: "upload rejected".to_string(),
        },
    );
    assert_eq!(effects, vec![QuickEffect::StopTracking]);
    assert_eq!(state.phase(), Phase::Polling);

    let snapshot = snapshot_with(vec![step("analysis", Some(result_id))]);
    let (state, effects) = observed(state, &snapshot);
    assert!(effects.is_empty());
    let view = state.view();
    assert!(view.halted);
    assert_eq!(view.last_error.as_deref(), Some("upload rejected"));
}

#[test]
fn upload_failure_before_completion_keeps_uploading_phase() {
    init_logging();
    let template_id = Uuid::new_v4();
    let (state, _) = update_quick(
        QuickTranscodeState::new(),
        QuickMsg::BufferReceived {
            template_id,
            byte_len: 10,
        },
    );
    let (state, _) = update_quick(
        state,
        QuickMsg::Failed {
            message: "Server error: 500".to_string(),
        },
    );
    let (state, effects) = update_quick(state, QuickMsg::UploadCompleted);
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Uploading);
}

#[test]
fn second_buffer_is_ignored_until_reset() {
    init_logging();
    let state = polling(Uuid::new_v4());
    let (state, effects) = update_quick(
        state,
        QuickMsg::BufferReceived {
            template_id: Uuid::new_v4(),
            byte_len: 1,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Polling);

    let (mut state, effects) = update_quick(state, QuickMsg::Reset);
    assert_eq!(effects, vec![QuickEffect::StopTracking]);
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.consume_dirty());
}

#[test]
fn empty_buffer_is_rejected() {
    init_logging();
    let (state, effects) = update_quick(
        QuickTranscodeState::new(),
        QuickMsg::BufferReceived {
            template_id: Uuid::new_v4(),
            byte_len: 0,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.view().last_error.is_some());
}

#[test]
fn upload_progress_is_clamped() {
    init_logging();
    let (state, _) = update_quick(
        QuickTranscodeState::new(),
        QuickMsg::BufferReceived {
            template_id: Uuid::new_v4(),
            byte_len: 10,
        },
    );
    let (state, _) = update_quick(state, QuickMsg::UploadProgress(1.7));
    assert_eq!(state.view().upload_progress, Some(1.0));
    let (state, _) = update_quick(state, QuickMsg::UploadProgress(f32::NAN));
    assert_eq!(state.view().upload_progress, Some(1.0));
}
