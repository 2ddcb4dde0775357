use upload_core::{AppViewModel, ProcessedImage, ProgressView, Stage, Status};

use super::surface::{MessageSeverity, SurfaceCommand};

/// Commands for every field of `view` that differs from `previous`.
/// `previous = None` renders the whole page.
pub fn render(previous: Option<&AppViewModel>, view: &AppViewModel) -> Vec<SurfaceCommand> {
    let mut cmds = Vec::new();

    if let (Some(source), Some(name)) = (&view.original, &view.original_name) {
        if changed(previous, |prev| prev.selection != view.selection) {
            cmds.push(SurfaceCommand::SetOriginalSource {
                source: source.clone(),
                name: name.clone(),
            });
        }
    }

    if let Some(image) = &view.processed {
        if changed(previous, |prev| prev.processed.as_ref() != Some(image)) {
            cmds.push(SurfaceCommand::SetProcessedSource {
                source: image.source.clone(),
                detail: processed_detail(image),
            });
        }
    }

    if changed(previous, |prev| prev.phase != view.phase) {
        cmds.push(SurfaceCommand::SetPhase {
            label: view.phase.as_str(),
        });
    }

    if changed(previous, |prev| prev.status != view.status) {
        cmds.push(SurfaceCommand::SetStatus {
            text: view.status.to_string(),
            severity: severity_of(&view.status),
        });
    }

    if let Some(progress) = view.progress {
        if changed(previous, |prev| prev.progress != Some(progress)) {
            cmds.push(SurfaceCommand::SetProgress {
                text: format_progress(progress),
            });
        }
    }

    cmds
}

fn changed(previous: Option<&AppViewModel>, differs: impl Fn(&AppViewModel) -> bool) -> bool {
    previous.map_or(true, differs)
}

fn severity_of(status: &Status) -> MessageSeverity {
    match status {
        Status::ServerError(_) | Status::NetworkError(_) => MessageSeverity::Error,
        Status::NeedImage | Status::Cancelled => MessageSeverity::Warning,
        Status::Ready | Status::Uploading | Status::Done => MessageSeverity::Information,
    }
}

fn format_progress(progress: ProgressView) -> String {
    let label = stage_label(progress.stage);
    match progress.bytes {
        Some(bytes) => format!("{label} {} B", format_with_commas(bytes)),
        None => label.to_string(),
    }
}

fn processed_detail(image: &ProcessedImage) -> String {
    let size = format!("{} B", format_with_commas(image.byte_len));
    match &image.content_type {
        Some(content_type) => format!("{size}, {content_type}"),
        None => size,
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Uploading => "Uploading",
        Stage::Receiving => "Receiving",
        Stage::Writing => "Writing",
        Stage::Done => "Done",
    }
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}
