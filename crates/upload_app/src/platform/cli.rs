use std::path::PathBuf;

use clap::{Parser, Subcommand};
use upload_core::{Phase, UnknownPhase};

#[derive(Debug, Parser)]
#[command(
    name = "phase-upload",
    author,
    version,
    about = "Send an image and a phase to the processing endpoint and keep the result"
)]
pub struct Cli {
    /// RON config file. Defaults to ./phase_upload.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Overrides the configured endpoint URL.
    #[arg(long, global = true)]
    pub endpoint: Option<String>,
    /// Overrides the directory processed images are stored in.
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,
    /// Also write logs to ./phase_upload.log.
    #[arg(long, global = true)]
    pub log_file: bool,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload one image and wait for the processed result.
    Upload {
        #[arg(short, long)]
        image: PathBuf,
        #[arg(short, long, default_value = "arterial", value_parser = parse_phase)]
        phase: Phase,
    },
    /// Drive the controller from stdin: open, phase, submit, cancel, quit.
    Interactive,
    /// Check that the backend answers on its health route.
    Health,
}

fn parse_phase(raw: &str) -> Result<Phase, UnknownPhase> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use upload_core::Phase;

    use super::{Cli, Command};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upload_defaults_to_arterial() {
        let cli = Cli::parse_from(["phase-upload", "upload", "--image", "scan.png"]);
        match cli.command {
            Command::Upload { phase, image } => {
                assert_eq!(phase, Phase::Arterial);
                assert_eq!(image.to_str(), Some("scan.png"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_overrides_parse_after_subcommand() {
        let cli = Cli::parse_from([
            "phase-upload",
            "upload",
            "-i",
            "scan.png",
            "-p",
            "Venous",
            "--endpoint",
            "http://example.com/process",
        ]);
        assert_eq!(cli.endpoint.as_deref(), Some("http://example.com/process"));
        assert!(matches!(
            cli.command,
            Command::Upload {
                phase: Phase::Venous,
                ..
            }
        ));
    }

    #[test]
    fn unknown_phase_is_rejected() {
        let result = Cli::try_parse_from(["phase-upload", "upload", "-i", "a.png", "-p", "portal"]);
        assert!(result.is_err());
    }
}
