// completion.rs

use rustyline::completion::{Completer, Pair};
use rustyline::{Helper, Context};
use rustyline::hint::Hinter;
use rustyline::highlight::Highlighter;
use rustyline::validate::{Validator, ValidationContext, ValidationResult};
use rustyline::error::ReadlineError;
use std::cell::RefCell;

use crate::commands::BUILTINS;
use crate::process::is_executable;

/// Completes command names at the prompt, or the offered labels while a
/// pick is open.
pub struct ConsoleHelper {
    labels: RefCell<Vec<String>>,
}

impl ConsoleHelper {
    pub fn new() -> Self {
        Self { labels: RefCell::new(Vec::new()) }
    }
    pub fn set_labels(&self, labels: &[String]) {
        *self.labels.borrow_mut() = labels.to_vec();
    }
    pub fn clear_labels(&self) {
        self.labels.borrow_mut().clear();
    }
    fn picking(&self) -> bool {
        !self.labels.borrow().is_empty()
    }
}

/// Builtins and executables on `PATH` starting with `prefix`, sorted.
pub fn command_names(prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = BUILTINS
        .iter()
        .filter(|b| b.starts_with(prefix))
        .map(|b| b.to_string())
        .collect();
    if let Some(path_var) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_var) {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let file_name = entry.file_name();
                let Some(name) = file_name.to_str() else { continue };
                if name.starts_with(prefix) && is_executable(&entry.path()) {
                    names.push(name.to_string());
                }
            }
        }
    }
    names.sort();
    names.dedup();
    names
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;
    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let prefix = &line[..pos];
        if self.picking() {
            let matches = self
                .labels
                .borrow()
                .iter()
                .filter(|l| l.starts_with(prefix))
                .map(|l| Pair { display: l.clone(), replacement: l.clone() })
                .collect();
            return Ok((0, matches));
        }
        // only the command word is completed
        if prefix.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }
        let completions = command_names(prefix)
            .into_iter()
            .map(|n| Pair { display: n.clone(), replacement: format!("{} ", n) })
            .collect();
        Ok((0, completions))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;
    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ConsoleHelper {}

impl Validator for ConsoleHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> Result<ValidationResult, ReadlineError> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Helper for ConsoleHelper {}
