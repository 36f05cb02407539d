use crate::{
    BatchContentState, BatchEffect, BatchMsg, LoadStatus, Phase, QuickEffect, QuickMsg,
    QuickTranscodeState,
};

/// Pure update function for the batch listing: applies a message and returns the
/// effects the engine has to run.
///
/// Messages tagged with a superseded generation are dropped without touching state.
pub fn update_batch(
    mut state: BatchContentState,
    msg: BatchMsg,
) -> (BatchContentState, Vec<BatchEffect>) {
    let effects = match msg {
        BatchMsg::LoadRequested { batch_id, filter } => start_load(&mut state, batch_id, filter),
        BatchMsg::FilterChanged { filter } => match state.batch_id() {
            Some(batch_id) if filter != state.filter() => start_load(&mut state, batch_id, filter),
            _ => Vec::new(),
        },
        BatchMsg::MoreRequested => {
            if state.resume() {
                vec![BatchEffect::ResumeStream {
                    generation: state.generation(),
                }]
            } else {
                Vec::new()
            }
        }
        BatchMsg::CancelRequested => {
            state.cancel();
            vec![BatchEffect::CancelStream]
        }
        BatchMsg::RecordReceived { generation, entry } => {
            if accepts(&state, generation) {
                state.push_record(entry);
            }
            Vec::new()
        }
        BatchMsg::MalformedRecord {
            generation,
            message,
        } => {
            if accepts(&state, generation) {
                state.record_malformed(message);
            }
            Vec::new()
        }
        BatchMsg::PageFilled { generation } => {
            if accepts(&state, generation) {
                state.finish_page(true);
            }
            Vec::new()
        }
        BatchMsg::StreamExhausted { generation } => {
            if accepts(&state, generation) {
                state.finish_page(false);
            }
            Vec::new()
        }
        BatchMsg::StreamFailed {
            generation,
            message,
        } => {
            if accepts(&state, generation) {
                state.fail(message);
                vec![BatchEffect::CancelStream]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn start_load(
    state: &mut BatchContentState,
    batch_id: crate::BatchId,
    filter: crate::BatchFilter,
) -> Vec<BatchEffect> {
    let generation = state.begin_load(batch_id, filter);
    vec![
        BatchEffect::CancelStream,
        BatchEffect::OpenStream {
            generation,
            batch_id,
            filter,
        },
    ]
}

fn accepts(state: &BatchContentState, generation: crate::Generation) -> bool {
    state.is_current(generation) && state.status() == LoadStatus::Loading
}

/// Pure update function for the quick transcode phase machine.
pub fn update_quick(
    mut state: QuickTranscodeState,
    msg: QuickMsg,
) -> (QuickTranscodeState, Vec<QuickEffect>) {
    let effects = match msg {
        QuickMsg::BufferReceived {
            template_id,
            byte_len,
        } => {
            if state.phase() != Phase::Idle || state.is_halted() {
                return (state, Vec::new());
            }
            if byte_len == 0 {
                state.set_error("the selected file is empty".to_string());
                return (state, Vec::new());
            }
            state.start_upload(template_id, byte_len);
            vec![QuickEffect::CreateJob { template_id }]
        }
        QuickMsg::UploadProgress(fraction) => {
            if state.phase() == Phase::Uploading && !state.is_halted() && !fraction.is_nan() {
                state.set_upload_progress(fraction.clamp(0.0, 1.0));
            }
            Vec::new()
        }
        QuickMsg::JobCreated { job_id } => {
            if state.phase() != Phase::Uploading || state.is_halted() {
                return (state, Vec::new());
            }
            state.set_job(job_id);
            vec![
                QuickEffect::StartTracking { job_id },
                QuickEffect::Upload { job_id },
            ]
        }
        QuickMsg::UploadCompleted => {
            if !state.is_halted() {
                state.set_upload_progress(1.0);
                state.advance(Phase::Polling);
            }
            Vec::new()
        }
        QuickMsg::JobObserved {
            status,
            analysis_id,
        } => {
            state.set_job_status(status);
            if state.is_halted() || analysis_id == state.observed_analysis() {
                return (state, Vec::new());
            }
            state.set_observed_analysis(analysis_id);
            match analysis_id {
                Some(result_id) if !result_id.is_nil() => {
                    vec![QuickEffect::FetchAnalysis { result_id }]
                }
                _ => Vec::new(),
            }
        }
        QuickMsg::AnalysisLoaded { result_id, info } => {
            if !state.is_halted() && state.observed_analysis() == Some(result_id) {
                state.set_analysis(info);
                state.advance(Phase::AnalysisReady);
            }
            Vec::new()
        }
        QuickMsg::AnalysisUnavailable { result_id } => {
            // Forget the id so the next poll that reports it asks again.
            if state.observed_analysis() == Some(result_id) {
                state.set_observed_analysis(None);
            }
            Vec::new()
        }
        QuickMsg::Failed { message } => {
            state.halt(message);
            vec![QuickEffect::StopTracking]
        }
        QuickMsg::Reset => {
            state = QuickTranscodeState::new();
            state.mark_dirty();
            vec![QuickEffect::StopTracking]
        }
    };

    (state, effects)
}
