// error.rs

use std::path::PathBuf;
use thiserror::Error;

use crate::candidates::EmptyCandidateSet;

/// Failures of a single command. Each one is shown to the user as a status
/// line and the console carries on.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{command}: missing argument <{what}>")]
    MissingArgument { command: &'static str, what: &'static str },
    #[error("{command}: invalid argument `{value}`: {reason}")]
    InvalidArgument { command: &'static str, value: String, reason: String },
    #[error("{}: No such file", .0.display())]
    FileNotFound(PathBuf),
    #[error("{}: No such directory", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("{}: line {line} is past the end of the file", .file.display())]
    NoSuchLine { file: PathBuf, line: usize },
    #[error("{0}: command not found")]
    ProgramNotFound(String),
    #[error("{program} exited with status {status}{}", stderr_suffix(.stderr))]
    ProcessFailed { program: String, status: i32, stderr: String },
    #[error("{what}: {source}")]
    EmptyCandidates { what: &'static str, source: EmptyCandidateSet },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn stderr_suffix(stderr: &str) -> String {
    match stderr.lines().find(|l| !l.trim().is_empty()) {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failure_shows_first_stderr_line() {
        let err = CommandError::ProcessFailed {
            program: "amixer".into(),
            status: 1,
            stderr: "\namixer: Unable to find simple control\nmore\n".into(),
        };
        assert_eq!(err.to_string(), "amixer exited with status 1: amixer: Unable to find simple control");
    }

    #[test]
    fn process_failure_without_stderr() {
        let err = CommandError::ProcessFailed { program: "slock".into(), status: 2, stderr: String::new() };
        assert_eq!(err.to_string(), "slock exited with status 2");
    }

    #[test]
    fn empty_candidates_is_informational() {
        let err = CommandError::EmptyCandidates { what: "recompile", source: EmptyCandidateSet };
        assert_eq!(err.to_string(), "recompile: no candidates to select from");
    }
}
