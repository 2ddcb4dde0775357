//! Platform logging initialization for the upload app.
//!
//! Optionally writes logs to `./phase_upload.log` in the current working directory.

use std::fs::File;
use std::path::PathBuf;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

const LOG_FILENAME: &str = "./phase_upload.log";

/// Destination for log output.
pub enum LogDestination {
    /// Write to terminal (stderr).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

impl LogDestination {
    pub fn from_flag(log_file: bool) -> Self {
        if log_file {
            LogDestination::Both
        } else {
            LogDestination::Terminal
        }
    }
}

/// Initialize the logger with the specified destination.
///
/// Terminal output goes to stderr so it never interleaves with the status lines.
pub fn initialize(destination: LogDestination, verbose: bool) {
    let level = if verbose {
        upload_logging::default_level(true)
    } else {
        LevelFilter::Warn
    };
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let LogDestination::Both = destination {
        // The file always gets the full info stream.
        if let Some(file_logger) = create_file_logger(level.max(LevelFilter::Info), config) {
            loggers.push(file_logger);
        }
    }

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from(LOG_FILENAME);
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}
