// history.rs

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// Append-only log of past entries. Once `capacity` is reached the oldest
/// entry is evicted.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    capacity: usize,
    /// Total pushes ever, evicted entries included.
    pushed: u64,
}

impl<T> History<T> {
    pub fn new(capacity: usize) -> Self {
        Self { entries: VecDeque::new(), capacity: capacity.max(1), pushed: 0 }
    }
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
        self.pushed += 1;
    }
    /// Keeps counting after the log is full, unlike [`History::len`].
    pub fn pushed(&self) -> u64 {
        self.pushed
    }
    pub fn get(&self, n: usize) -> Option<&T> {
        self.entries.get(n)
    }
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn clear(&mut self) {
        self.entries.clear();
    }
    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }
    /// Newest first, the order pickers offer entries in.
    pub fn recent_first(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }
}

impl History<String> {
    /// Appends the non-blank lines of `path`. A missing file adds nothing.
    pub fn load_lines(&mut self, path: &Path) -> io::Result<usize> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut added = 0;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if !line.trim().is_empty() {
                self.push(line);
                added += 1;
            }
        }
        Ok(added)
    }

    pub fn write_lines(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        for entry in self.iter() {
            writeln!(file, "{}", entry)?;
        }
        Ok(())
    }

    /// Appends the entries pushed since `seen` (a previous [`History::pushed`])
    /// and returns how many were written. Entries already evicted are lost.
    pub fn append_lines(&self, path: &Path, seen: u64) -> io::Result<usize> {
        let new = usize::try_from(self.pushed.saturating_sub(seen))
            .unwrap_or(usize::MAX)
            .min(self.len());
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for entry in self.iter().skip(self.len() - new) {
            writeln!(file, "{}", entry)?;
        }
        Ok(new)
    }
}
