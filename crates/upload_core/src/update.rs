use crate::{AppState, Effect, Msg, Status};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(None) => Vec::new(),
        Msg::FileSelected(Some(file)) => {
            // Preview only; nothing is sent until Submit.
            state.select_file(file);
            Vec::new()
        }
        Msg::PhaseSelected(phase) => {
            state.set_phase(phase);
            Vec::new()
        }
        Msg::SubmitClicked => {
            let Some(file) = state.selected().cloned() else {
                state.set_status(Status::NeedImage);
                return (state, Vec::new());
            };
            let phase = state.phase();
            let (request_id, superseded) = state.begin_request();
            let mut effects = Vec::with_capacity(1 + usize::from(superseded.is_some()));
            if let Some(stale) = superseded {
                effects.push(Effect::CancelUpload { request_id: stale });
            }
            effects.push(Effect::Upload {
                request_id,
                file,
                phase,
            });
            effects
        }
        Msg::CancelClicked => match state.take_in_flight() {
            Some(request_id) => {
                state.set_status(Status::Cancelled);
                vec![Effect::CancelUpload { request_id }]
            }
            None => Vec::new(),
        },
        Msg::UploadProgress {
            request_id,
            stage,
            bytes,
        } => {
            state.apply_progress(request_id, stage, bytes);
            Vec::new()
        }
        Msg::UploadSucceeded { request_id, image } => {
            if state.finish_request(request_id) {
                state.set_processed(image);
                state.set_status(Status::Done);
            }
            Vec::new()
        }
        Msg::UploadFailed {
            request_id,
            failure,
        } => {
            if state.finish_request(request_id) {
                state.set_status(Status::from(&failure));
            }
            Vec::new()
        }
    };

    (state, effects)
}
