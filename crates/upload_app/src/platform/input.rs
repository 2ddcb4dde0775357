//! Line commands accepted by interactive mode.

use std::path::PathBuf;

use upload_core::Phase;

pub const HELP: &str = "commands: open <path> | phase <arterial|venous> | submit | cancel | help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Open(PathBuf),
    Phase(Phase),
    Submit,
    Cancel,
    Help,
    Quit,
    Empty,
}

pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    match word.to_ascii_lowercase().as_str() {
        "" => Ok(Input::Empty),
        "open" if rest.is_empty() => Err("open needs a path".to_string()),
        "open" => Ok(Input::Open(PathBuf::from(rest))),
        "phase" => rest.parse().map(Input::Phase).map_err(|err| err.to_string()),
        "submit" => Ok(Input::Submit),
        "cancel" => Ok(Input::Cancel),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" => Ok(Input::Quit),
        other => Err(format!("unknown command '{other}'; {HELP}")),
    }
}
