use std::io::Write;

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Information,
    Warning,
    Error,
}

/// One visible change of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceCommand {
    SetOriginalSource { source: Url, name: String },
    SetProcessedSource { source: Url, detail: String },
    SetPhase { label: &'static str },
    SetStatus { text: String, severity: MessageSeverity },
    SetProgress { text: String },
}

/// Where the controller's view ends up. Injected so tests can record it.
pub trait Surface {
    fn apply(&mut self, command: SurfaceCommand);
}

/// Prints every change as one line.
pub struct TerminalSurface<W: Write> {
    out: W,
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Surface for TerminalSurface<W> {
    fn apply(&mut self, command: SurfaceCommand) {
        let line = match command {
            SurfaceCommand::SetOriginalSource { source, name } => {
                format!("original:  {name} ({source})")
            }
            SurfaceCommand::SetProcessedSource { source, detail } => {
                format!("processed: {source} ({detail})")
            }
            SurfaceCommand::SetPhase { label } => format!("phase:     {label}"),
            SurfaceCommand::SetStatus { text, severity } => match severity {
                MessageSeverity::Error => format!("status:    [error] {text}"),
                MessageSeverity::Warning | MessageSeverity::Information => {
                    format!("status:    {text}")
                }
            },
            SurfaceCommand::SetProgress { text } => format!("progress:  {text}"),
        };
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageSeverity, Surface, SurfaceCommand, TerminalSurface};

    #[test]
    fn terminal_prints_one_line_per_command() {
        let mut out = Vec::new();
        {
            let mut surface = TerminalSurface::new(&mut out);
            surface.apply(SurfaceCommand::SetStatus {
                text: "Server error: image file missing".to_string(),
                severity: MessageSeverity::Error,
            });
            surface.apply(SurfaceCommand::SetPhase { label: "venous" });
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "status:    [error] Server error: image file missing\nphase:     venous\n"
        );
    }
}
