// commands.rs

use std::path::Path;

use itertools::Itertools;
use tracing::{debug, info};

use crate::candidates::{build_candidates, select_candidate, Selector};
use crate::error::CommandError;
use crate::marks::Position;
use crate::parser::{quote, split_words};
use crate::process::ProcessRunner;
use crate::session::Session;
use crate::util::expand_tilde;
use crate::utilities;

pub const BUILTINS: &[&str] = &[
    "compile",
    "exit",
    "goto-mark",
    "help",
    "history",
    "history-eval",
    "load-path",
    "lock",
    "mark",
    "pdf",
    "recompile",
    "repeat",
    "screenshot",
    "transparency",
    "volume",
];

/// Commands that open a picker. Replaying one of them from history would
/// just open another picker, so they are never offered as candidates.
const PICKERS: &[&str] = &["history-eval", "repeat", "goto-mark", "recompile"];

const HELP: &[(&str, &str)] = &[
    ("history [n | -r f | -w f | -a f]", "list, read, write or append the command history"),
    ("history-eval, repeat", "pick a previous command and run it again"),
    ("mark <file> <line>", "remember a position"),
    ("goto-mark", "pick a remembered position and jump to it"),
    ("compile <command...>", "run a build command"),
    ("recompile", "pick a previous build command and run it again"),
    ("load-path [add|add-subdirs|remove <dir>]", "show or change the load path"),
    ("volume <up|down|mute|N>", "change the audio volume"),
    ("transparency <percent>", "set window opacity"),
    ("lock", "lock the screen"),
    ("screenshot [file]", "capture the screen"),
    ("pdf <file>", "convert a document to PDF"),
    ("exit [code]", "leave the console"),
];

/// What a command produced, for the console to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// One-line status message.
    Status(String),
    /// Several lines, e.g. a listing.
    Lines(Vec<String>),
    /// An external program ran.
    Output { stdout: String, stderr: String, status: String, code: i32 },
    /// The user backed out of a picker.
    Cancelled,
    /// Nothing to print, e.g. a blank line.
    Quiet,
    /// Leave the console with this code.
    Exit(i32),
}

impl Outcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Output { code, .. } | Outcome::Exit(code) => *code,
            _ => 0,
        }
    }
}

/// Runs one console line. Recording it in the history is the caller's job.
pub fn run_line<R: ProcessRunner>(
    line: &str,
    session: &mut Session<R>,
    selector: &mut dyn Selector,
) -> Result<Outcome, CommandError> {
    let words = split_words(line);
    let Some((command, args)) = words.split_first() else {
        return Ok(Outcome::Quiet);
    };
    debug!(command = %command, ?args, "dispatching");
    match command.as_str() {
        "exit" => {
            let code = match args.first() {
                Some(arg) => arg.parse().map_err(|_| CommandError::InvalidArgument {
                    command: "exit",
                    value: arg.clone(),
                    reason: "expected a number".into(),
                })?,
                None => 0,
            };
            Ok(Outcome::Exit(code))
        }
        "help" => Ok(Outcome::Lines(
            HELP.iter().map(|(usage, what)| format!("{:<42} {}", usage, what)).collect(),
        )),
        "history" => history(args, session),
        "history-eval" | "repeat" => history_eval(session, selector),
        "mark" => mark(args, session),
        "goto-mark" => goto_mark(session, selector),
        "compile" => compile(args, session),
        "recompile" => recompile(session, selector),
        "load-path" => load_path(args, session),
        "volume" => {
            let arg = required(args, "volume", "up|down|mute|N")?;
            utilities::volume(&mut session.runner, &session.config, arg).map(Outcome::Status)
        }
        "transparency" => {
            let arg = required(args, "transparency", "percent")?;
            utilities::transparency(&mut session.runner, &session.config, arg).map(Outcome::Status)
        }
        "lock" => utilities::lock(&mut session.runner, &session.config).map(Outcome::Status),
        "screenshot" => {
            let file = args.first().map(String::as_str);
            utilities::screenshot(&mut session.runner, &session.config, file).map(Outcome::Status)
        }
        "pdf" => {
            let file = required(args, "pdf", "file")?;
            let file = expand_tilde(file);
            let file = file.to_string_lossy();
            utilities::pdf(&mut session.runner, &session.config, &file).map(Outcome::Status)
        }
        _ => run_program(&words, session),
    }
}

fn required<'a>(
    args: &'a [String],
    command: &'static str,
    what: &'static str,
) -> Result<&'a str, CommandError> {
    args.first()
        .map(String::as_str)
        .ok_or(CommandError::MissingArgument { command, what })
}

fn not_replayable(label: &str) -> bool {
    match split_words(label).first() {
        None => true,
        Some(first) => PICKERS.contains(&first.as_str()),
    }
}

fn history<R: ProcessRunner>(
    args: &[String],
    session: &mut Session<R>,
) -> Result<Outcome, CommandError> {
    match args {
        [flag, file] if flag.starts_with('-') => {
            let path = expand_tilde(file);
            match flag.as_str() {
                "-r" => {
                    let n = session.history.load_lines(&path)?;
                    Ok(Outcome::Status(format!("Read {} entries from {}", n, path.display())))
                }
                "-w" => {
                    let n = session.write_history(&path)?;
                    Ok(Outcome::Status(format!("Wrote {} entries to {}", n, path.display())))
                }
                "-a" => {
                    let n = session.append_history(&path)?;
                    Ok(Outcome::Status(format!("Appended {} entries to {}", n, path.display())))
                }
                _ => Err(CommandError::InvalidArgument {
                    command: "history",
                    value: flag.clone(),
                    reason: "expected -r, -w or -a".into(),
                }),
            }
        }
        [] | [_] => {
            let total = session.history.len();
            let count = match args.first() {
                Some(n) => n.parse::<usize>().map_err(|_| CommandError::InvalidArgument {
                    command: "history",
                    value: n.clone(),
                    reason: "expected a count".into(),
                })?,
                None => total,
            };
            let start = total.saturating_sub(count);
            Ok(Outcome::Lines(
                session
                    .history
                    .iter()
                    .enumerate()
                    .skip(start)
                    .map(|(i, cmd)| format!("{:>5}  {}", i + 1, cmd))
                    .collect(),
            ))
        }
        _ => Err(CommandError::InvalidArgument {
            command: "history",
            value: args.join(" "),
            reason: "too many arguments".into(),
        }),
    }
}

fn history_eval<R: ProcessRunner>(
    session: &mut Session<R>,
    selector: &mut dyn Selector,
) -> Result<Outcome, CommandError> {
    let chosen = {
        let set = build_candidates(
            session.history.recent_first(),
            |e: &String| e.trim().to_string(),
            not_replayable,
        );
        select_candidate(&set, "Repeat command: ", selector)
            .map_err(|source| CommandError::EmptyCandidates { what: "history-eval", source })?
            .cloned()
    };
    let Some(line) = chosen else {
        return Ok(Outcome::Cancelled);
    };
    info!(line = %line, "repeating command");
    session.history.push(line.clone());
    run_line(&line, session, selector)
}

fn mark<R: ProcessRunner>(
    args: &[String],
    session: &mut Session<R>,
) -> Result<Outcome, CommandError> {
    let file = required(args, "mark", "file")?;
    let line = required(&args[1..], "mark", "line")?;
    let line: usize = line.parse().map_err(|_| CommandError::InvalidArgument {
        command: "mark",
        value: line.to_string(),
        reason: "expected a line number".into(),
    })?;
    let position = Position::read(&expand_tilde(file), line)?;
    let status = format!("Mark set at {}", position.location());
    session.marks.push(position);
    Ok(Outcome::Status(status))
}

fn goto_mark<R: ProcessRunner>(
    session: &mut Session<R>,
    selector: &mut dyn Selector,
) -> Result<Outcome, CommandError> {
    let set = build_candidates(session.marks.recent_first(), Position::label, str::is_empty);
    let chosen = select_candidate(&set, "Go to mark: ", selector)
        .map_err(|source| CommandError::EmptyCandidates { what: "goto-mark", source })?;
    Ok(match chosen {
        Some(position) => Outcome::Status(position.location()),
        None => Outcome::Cancelled,
    })
}

fn compile<R: ProcessRunner>(
    args: &[String],
    session: &mut Session<R>,
) -> Result<Outcome, CommandError> {
    if args.is_empty() {
        return Err(CommandError::MissingArgument { command: "compile", what: "command" });
    }
    let command = args.iter().map(|a| quote(a)).join(" ");
    session.compile_history.push(command.clone());
    run_compilation(&command, session)
}

fn recompile<R: ProcessRunner>(
    session: &mut Session<R>,
    selector: &mut dyn Selector,
) -> Result<Outcome, CommandError> {
    let chosen = {
        let set = build_candidates(
            session.compile_history.recent_first(),
            |e: &String| e.clone(),
            |l: &str| l.trim().is_empty(),
        );
        select_candidate(&set, "Compile command: ", selector)
            .map_err(|source| CommandError::EmptyCandidates { what: "recompile", source })?
            .cloned()
    };
    let Some(command) = chosen else {
        return Ok(Outcome::Cancelled);
    };
    session.compile_history.push(command.clone());
    run_compilation(&command, session)
}

fn run_compilation<R: ProcessRunner>(
    command: &str,
    session: &mut Session<R>,
) -> Result<Outcome, CommandError> {
    info!(command, "compiling");
    let words = split_words(command);
    let Some((program, args)) = words.split_first() else {
        return Err(CommandError::MissingArgument { command: "compile", what: "command" });
    };
    let out = session.runner.invoke(program, args)?;
    let status = if out.success() {
        "Compilation finished".to_string()
    } else {
        format!("Compilation exited abnormally with code {}", out.status)
    };
    Ok(Outcome::Output { stdout: out.stdout, stderr: out.stderr, status, code: out.status })
}

fn load_path<R: ProcessRunner>(
    args: &[String],
    session: &mut Session<R>,
) -> Result<Outcome, CommandError> {
    match args {
        [] if session.load_path.is_empty() => Ok(Outcome::Status("load-path is empty".into())),
        [] => Ok(Outcome::Lines(
            session.load_path.iter().map(|d| d.display().to_string()).collect(),
        )),
        [action, dir] => {
            let dir = expand_tilde(dir);
            let dir: &Path = &dir;
            let status = match action.as_str() {
                "add" => {
                    if session.load_path.add(dir)? {
                        format!("Added {} to load-path", dir.display())
                    } else {
                        format!("{} is already on load-path", dir.display())
                    }
                }
                "add-subdirs" => {
                    let n = session.load_path.add_with_subdirs(dir)?;
                    format!("Added {} directories under {} to load-path", n, dir.display())
                }
                "remove" => {
                    if session.load_path.remove(dir) {
                        format!("Removed {} from load-path", dir.display())
                    } else {
                        format!("{} is not on load-path", dir.display())
                    }
                }
                other => {
                    return Err(CommandError::InvalidArgument {
                        command: "load-path",
                        value: other.to_string(),
                        reason: "expected add, add-subdirs or remove".into(),
                    })
                }
            };
            Ok(Outcome::Status(status))
        }
        [action] => {
            let known = matches!(action.as_str(), "add" | "add-subdirs" | "remove");
            Err(CommandError::MissingArgument {
                command: "load-path",
                what: if known { "dir" } else { "action" },
            })
        }
        _ => Err(CommandError::InvalidArgument {
            command: "load-path",
            value: args.join(" "),
            reason: "too many arguments".into(),
        }),
    }
}

fn run_program<R: ProcessRunner>(
    words: &[String],
    session: &mut Session<R>,
) -> Result<Outcome, CommandError> {
    let Some((program, args)) = words.split_first() else {
        return Ok(Outcome::Quiet);
    };
    let out = session.runner.invoke(program, args)?;
    let status = if out.success() {
        format!("{} finished", program)
    } else {
        format!("{} exited with status {}", program, out.status)
    };
    Ok(Outcome::Output { stdout: out.stdout, stderr: out.stderr, status, code: out.status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::utilities::tests::FakeRunner;
    use std::collections::VecDeque;

    /// Answers picks from a script and remembers what it was offered.
    #[derive(Default)]
    struct Script {
        answers: VecDeque<Option<String>>,
        offered: Vec<Vec<String>>,
    }

    impl Script {
        fn new(answers: &[Option<&str>]) -> Self {
            Self {
                answers: answers.iter().map(|a| a.map(str::to_string)).collect(),
                offered: Vec::new(),
            }
        }
    }

    impl Selector for Script {
        fn select(&mut self, _prompt: &str, labels: &[String]) -> Option<String> {
            self.offered.push(labels.to_vec());
            self.answers.pop_front().flatten()
        }
    }

    fn session() -> Session<FakeRunner> {
        Session::new(Config::default(), FakeRunner::default())
    }

    /// Records the line then runs it, the way the console does.
    fn enter(
        line: &str,
        s: &mut Session<FakeRunner>,
        sel: &mut Script,
    ) -> Result<Outcome, CommandError> {
        s.history.push(line.to_string());
        run_line(line, s, sel)
    }

    #[test]
    fn unknown_words_run_as_programs() {
        let mut s = session();
        s.runner.stdout = "hello\n".into();
        let out = run_line("echo 'hello'", &mut s, &mut Script::default()).unwrap();
        assert_eq!(
            out,
            Outcome::Output {
                stdout: "hello\n".into(),
                stderr: "failed".into(),
                status: "echo finished".into(),
                code: 0
            }
        );
        assert_eq!(s.runner.calls, vec![("echo".to_string(), vec!["hello".to_string()])]);
    }

    #[test]
    fn missing_program_is_reported() {
        let mut s = session();
        let err = run_line("missing --flag", &mut s, &mut Script::default()).unwrap_err();
        assert_eq!(err.to_string(), "missing: command not found");
    }

    #[test]
    fn history_append_after_write_adds_only_new_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist");
        let p = quote(&path.to_string_lossy());
        let mut s = session();
        let mut sel = Script::default();
        enter("make", &mut s, &mut sel).unwrap();
        let wrote = enter(&format!("history -w {}", p), &mut s, &mut sel).unwrap();
        assert!(matches!(wrote, Outcome::Status(m) if m.starts_with("Wrote 2 entries")));
        let appended = enter(&format!("history -a {}", p), &mut s, &mut sel).unwrap();
        assert!(matches!(appended, Outcome::Status(m) if m.starts_with("Appended 1 entries")));
        let saved = std::fs::read_to_string(&path).unwrap();
        assert_eq!(saved.lines().count(), 3);
        assert!(saved.starts_with("make\n"));
    }

    #[test]
    fn history_eval_offers_distinct_commands_newest_first() {
        let mut s = session();
        let mut sel = Script::new(&[Some("ls -l")]);
        for line in ["ls -l", "make", "ls -l", "goto-mark"] {
            s.history.push(line.to_string());
        }
        let out = enter("history-eval", &mut s, &mut sel).unwrap();
        assert_eq!(sel.offered[0], vec!["ls -l", "make"]);
        assert!(matches!(out, Outcome::Output { .. }));
        assert_eq!(s.runner.calls[0].0, "ls");
        assert_eq!(s.history.last().map(String::as_str), Some("ls -l"));
    }

    #[test]
    fn history_eval_with_nothing_to_repeat() {
        let mut s = session();
        let mut sel = Script::default();
        let err = enter("repeat", &mut s, &mut sel).unwrap_err();
        assert!(matches!(err, CommandError::EmptyCandidates { what: "history-eval", .. }));
        assert!(sel.offered.is_empty());
    }

    #[test]
    fn cancelled_pick_runs_nothing() {
        let mut s = session();
        s.history.push("make".into());
        let mut sel = Script::new(&[None]);
        assert_eq!(enter("repeat", &mut s, &mut sel).unwrap(), Outcome::Cancelled);
        let mut sel = Script::new(&[Some("not offered")]);
        assert_eq!(enter("repeat", &mut s, &mut sel).unwrap(), Outcome::Cancelled);
        assert!(s.runner.calls.is_empty());
    }

    #[test]
    fn marks_are_picked_by_line_label() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, b"one\n  two\nthree\n").unwrap();
        let path = file.path().to_string_lossy().to_string();
        let mut s = session();
        let mut sel = Script::new(&[Some("2: two")]);
        run_line(&format!("mark {} 2", quote(&path)), &mut s, &mut sel).unwrap();
        run_line(&format!("mark {} 3", quote(&path)), &mut s, &mut sel).unwrap();
        run_line(&format!("mark {} 2", quote(&path)), &mut s, &mut sel).unwrap();
        let out = run_line("goto-mark", &mut s, &mut sel).unwrap();
        assert_eq!(sel.offered[0], vec!["2: two", "3: three"]);
        assert_eq!(out, Outcome::Status(format!("{}:2: two", path)));
    }

    #[test]
    fn goto_mark_without_marks() {
        let mut s = session();
        let err = run_line("goto-mark", &mut s, &mut Script::default()).unwrap_err();
        assert_eq!(err.to_string(), "goto-mark: no candidates to select from");
    }

    #[test]
    fn recompile_reruns_a_previous_command() {
        let mut s = session();
        let mut sel = Script::new(&[Some("cargo build")]);
        run_line("compile cargo build", &mut s, &mut sel).unwrap();
        s.runner.status = 2;
        let failed = run_line("compile make 'all tests'", &mut s, &mut sel).unwrap();
        assert_eq!(failed.exit_code(), 2);
        s.runner.status = 0;
        let out = run_line("recompile", &mut s, &mut sel).unwrap();
        assert_eq!(sel.offered[0], vec!["make 'all tests'", "cargo build"]);
        match out {
            Outcome::Output { status, .. } => assert_eq!(status, "Compilation finished"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(s.runner.calls[1], ("make".to_string(), vec!["all tests".to_string()]));
        assert_eq!(s.runner.calls[2].0, "cargo");
    }

    #[test]
    fn load_path_add_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let d = quote(&dir.path().to_string_lossy());
        let mut s = session();
        let mut sel = Script::default();
        let empty = Outcome::Status("load-path is empty".into());
        assert_eq!(run_line("load-path", &mut s, &mut sel).unwrap(), empty);
        let added = run_line(&format!("load-path add {}", d), &mut s, &mut sel).unwrap();
        assert!(matches!(added, Outcome::Status(m) if m.starts_with("Added")));
        let again = run_line(&format!("load-path add {}", d), &mut s, &mut sel).unwrap();
        assert!(matches!(again, Outcome::Status(m) if m.ends_with("is already on load-path")));
        assert_eq!(
            run_line("load-path", &mut s, &mut sel).unwrap(),
            Outcome::Lines(vec![dir.path().display().to_string()])
        );
        let removed = run_line(&format!("load-path remove {}", d), &mut s, &mut sel).unwrap();
        assert!(matches!(removed, Outcome::Status(m) if m.starts_with("Removed")));
        let err = run_line("load-path add /no/such/place", &mut s, &mut sel).unwrap_err();
        assert!(matches!(err, CommandError::DirectoryNotFound(_)));
    }

    #[test]
    fn history_lists_the_last_n() {
        let mut s = session();
        for line in ["a", "b", "c"] {
            s.history.push(line.into());
        }
        let out = run_line("history 2", &mut s, &mut Script::default()).unwrap();
        assert_eq!(out, Outcome::Lines(vec!["    2  b".into(), "    3  c".into()]));
    }

    #[test]
    fn exit_parses_its_code() {
        let mut s = session();
        assert_eq!(run_line("exit", &mut s, &mut Script::default()).unwrap(), Outcome::Exit(0));
        assert_eq!(run_line("exit 3", &mut s, &mut Script::default()).unwrap().exit_code(), 3);
        assert!(run_line("exit soon", &mut s, &mut Script::default()).is_err());
    }

    #[test]
    fn utilities_need_their_argument() {
        let mut s = session();
        let err = run_line("volume", &mut s, &mut Script::default()).unwrap_err();
        assert_eq!(err.to_string(), "volume: missing argument <up|down|mute|N>");
        let status = run_line("volume down", &mut s, &mut Script::default()).unwrap();
        assert_eq!(status, Outcome::Status("Volume down 5%".into()));
    }

    #[test]
    fn blank_line_does_nothing() {
        let mut s = session();
        assert_eq!(run_line("   ", &mut s, &mut Script::default()).unwrap(), Outcome::Quiet);
    }

    #[test]
    fn every_builtin_is_dispatched() {
        let mut s = session();
        for name in BUILTINS {
            if *name == "lock" || *name == "screenshot" {
                continue;
            }
            let result = run_line(name, &mut s, &mut Script::default());
            let dispatched = !matches!(result, Err(CommandError::ProgramNotFound(_)));
            assert!(dispatched, "{} was not dispatched", name);
            assert!(s.runner.calls.is_empty(), "{} ran a program", name);
        }
    }
}
