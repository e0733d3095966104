// marks.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::CommandError;
use crate::history::History;

pub type MarkRing = History<Position>;

/// A remembered line in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub file: PathBuf,
    /// 1-based.
    pub line: usize,
    pub text: String,
}

impl Position {
    /// Reads the text of `line` from `file`.
    pub fn read(file: &Path, line: usize) -> Result<Self, CommandError> {
        if line == 0 {
            return Err(CommandError::InvalidArgument {
                command: "mark",
                value: line.to_string(),
                reason: "lines are numbered from 1".into(),
            });
        }
        let handle = File::open(file).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CommandError::FileNotFound(file.to_path_buf()),
            _ => CommandError::Io(e),
        })?;
        let text = match BufReader::new(handle).lines().nth(line - 1) {
            Some(text) => text?,
            None => return Err(CommandError::NoSuchLine { file: file.to_path_buf(), line }),
        };
        Ok(Self { file: file.to_path_buf(), line, text })
    }

    /// `"<line>: <text>"`.
    pub fn label(&self) -> String {
        format!("{}: {}", self.line, self.text.trim())
    }

    pub fn location(&self) -> String {
        format!("{}:{}: {}", self.file.display(), self.line, self.text.trim())
    }
}
