// session.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::Config;
use crate::history::History;
use crate::load_path::LoadPath;
use crate::marks::MarkRing;
use crate::process::{ForkExecRunner, ProcessRunner};

/// Everything a console keeps between commands.
pub struct Session<R = ForkExecRunner> {
    pub config: Config,
    pub history: History<String>,
    pub compile_history: History<String>,
    pub marks: MarkRing,
    pub load_path: LoadPath,
    pub runner: R,
    /// For `history -a`: the [`History::pushed`] count each file is up to.
    appended: HashMap<PathBuf, u64>,
}

impl<R: ProcessRunner> Session<R> {
    pub fn new(config: Config, runner: R) -> Self {
        let mut load_path = LoadPath::new();
        // config order is kept: the first entry ends up first
        let initial: Vec<&Path> = config.existing_load_path().collect();
        for dir in initial.into_iter().rev() {
            if let Err(e) = load_path.add(dir) {
                warn!(error = %e, "skipping load_path entry");
            }
        }
        Self {
            history: History::new(config.history_size),
            compile_history: History::new(config.history_size),
            marks: MarkRing::new(config.mark_ring_size),
            load_path,
            runner,
            appended: HashMap::new(),
            config,
        }
    }

    /// Loads the configured history file. Failures are logged, not fatal.
    pub fn load_history(&mut self) {
        let Some(path) = self.config.history_file.clone() else { return };
        match self.history.load_lines(&path) {
            Ok(n) => {
                debug!(path = %path.display(), entries = n, "loaded history");
                self.appended.insert(path, self.history.pushed());
            }
            Err(e) => warn!(path = %path.display(), error = %e, "could not read history file"),
        }
    }

    /// Appends this session's new entries to the configured history file.
    pub fn save_history(&mut self) {
        let Some(path) = self.config.history_file.clone() else { return };
        if let Err(e) = self.append_history(&path) {
            warn!(path = %path.display(), error = %e, "could not save history");
        }
    }

    /// Replaces `path` with the whole history; a later append starts from here.
    pub fn write_history(&mut self, path: &Path) -> std::io::Result<usize> {
        self.history.write_lines(path)?;
        self.appended.insert(path.to_path_buf(), self.history.pushed());
        Ok(self.history.len())
    }

    /// Returns how many entries were written.
    pub fn append_history(&mut self, path: &Path) -> std::io::Result<usize> {
        let seen = self.appended.get(path).copied().unwrap_or(0);
        let written = self.history.append_lines(path, seen)?;
        self.appended.insert(path.to_path_buf(), self.history.pushed());
        Ok(written)
    }
}
