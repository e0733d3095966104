// repl.rs

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::io::Write;
use tracing::warn;

use crate::candidates::Selector;
use crate::commands::{run_line, Outcome};
use crate::completion::ConsoleHelper;
use crate::error::CommandError;
use crate::process::ProcessRunner;
use crate::session::Session;
use crate::util::writeln_ignore_broken_pipe;

/// The line editor, which doubles as the picker for history commands.
pub struct Console {
    editor: Editor<ConsoleHelper, DefaultHistory>,
}

impl Console {
    pub fn new() -> rustyline::Result<Self> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ConsoleHelper::new()));
        Ok(Self { editor })
    }

    /// Reads and runs lines until `exit` or end of input. Returns the exit code.
    pub fn run<R: ProcessRunner>(&mut self, session: &mut Session<R>) -> rustyline::Result<i32> {
        for line in session.history.iter() {
            let _ = self.editor.add_history_entry(line.as_str());
        }
        loop {
            match self.editor.readline("$ ") {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(trimmed);
                    if let Some(code) = self.execute(session, trimmed) {
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => return Ok(0),
                Err(err) => return Err(err),
            }
        }
    }

    /// Records and runs one line, printing what it produced. `Some(code)`
    /// means the console should stop.
    pub fn execute<R: ProcessRunner>(&mut self, session: &mut Session<R>, line: &str) -> Option<i32> {
        session.history.push(line.to_string());
        match run_line(line, session, self) {
            Ok(Outcome::Exit(code)) => Some(code),
            Ok(outcome) => {
                report(&outcome);
                None
            }
            Err(e) => {
                report_error(std::io::stderr(), &e);
                None
            }
        }
    }

    /// Like [`Console::execute`] but for a single `-c` line: the exit code is
    /// always returned.
    pub fn execute_once<R: ProcessRunner>(&mut self, session: &mut Session<R>, line: &str) -> i32 {
        session.history.push(line.to_string());
        match run_line(line, session, self) {
            Ok(outcome) => {
                report(&outcome);
                outcome.exit_code()
            }
            Err(e) => {
                report_error(std::io::stderr(), &e);
                1
            }
        }
    }
}

impl Selector for Console {
    fn select(&mut self, prompt: &str, labels: &[String]) -> Option<String> {
        let mut out = std::io::stdout();
        for (i, label) in labels.iter().enumerate() {
            let _ = writeln_ignore_broken_pipe(&mut out, format!("{:>4}) {}", i + 1, label));
        }
        out.flush().ok();
        if let Some(helper) = self.editor.helper() {
            helper.set_labels(labels);
        }
        let answer = self.editor.readline(prompt);
        if let Some(helper) = self.editor.helper() {
            helper.clear_labels();
        }
        match answer {
            Ok(line) => resolve_answer(line.trim(), labels),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => None,
            Err(err) => {
                warn!(error = %err, "reading a selection failed");
                None
            }
        }
    }
}

/// An exact label wins, then a 1-based index. Anything else is passed along
/// as free text, which matches no candidate.
pub fn resolve_answer(answer: &str, labels: &[String]) -> Option<String> {
    if answer.is_empty() {
        return None;
    }
    if labels.iter().any(|l| l == answer) {
        return Some(answer.to_string());
    }
    match answer.parse::<usize>() {
        Ok(n) if (1..=labels.len()).contains(&n) => Some(labels[n - 1].clone()),
        _ => Some(answer.to_string()),
    }
}

pub fn report(outcome: &Outcome) {
    let mut out = std::io::stdout();
    match outcome {
        Outcome::Status(msg) => {
            let _ = writeln_ignore_broken_pipe(&mut out, msg);
        }
        Outcome::Lines(lines) => {
            for line in lines {
                let _ = writeln_ignore_broken_pipe(&mut out, line);
            }
        }
        Outcome::Output { stdout, stderr, status, .. } => {
            let _ = out.write_all(stdout.as_bytes());
            let _ = std::io::stderr().write_all(stderr.as_bytes());
            let _ = writeln_ignore_broken_pipe(&mut out, status);
        }
        Outcome::Cancelled => {
            let _ = writeln_ignore_broken_pipe(&mut out, "Cancelled");
        }
        Outcome::Quiet | Outcome::Exit(_) => {}
    }
    out.flush().ok();
}

/// Command errors go to stderr whether the line came from the prompt or `-c`.
fn report_error<W: Write>(err: W, e: &CommandError) {
    let _ = writeln_ignore_broken_pipe(err, e.to_string());
}
