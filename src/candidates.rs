// candidates.rs

use itertools::Itertools;
use thiserror::Error;

/// A display label paired with the history entry it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate<'a, T> {
    pub label: String,
    pub value: &'a T,
}

/// Candidates in first-seen order. Labels are unique within a set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet<'a, T> {
    candidates: Vec<Candidate<'a, T>>,
}

impl<'a, T> CandidateSet<'a, T> {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &Candidate<'a, T>> {
        self.candidates.iter()
    }
    pub fn labels(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.label.clone()).collect()
    }
    /// Maps a label back to the entry it was rendered from.
    pub fn find(&self, label: &str) -> Option<&'a T> {
        self.candidates
            .iter()
            .find(|c| c.label == label)
            .map(|c| c.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no candidates to select from")]
pub struct EmptyCandidateSet;

/// Something that can show a list of labels and hand back the user's answer.
pub trait Selector {
    /// `None` when the user cancelled or typed nothing.
    fn select(&mut self, prompt: &str, labels: &[String]) -> Option<String>;
}

/// Renders every entry, drops excluded labels and keeps the first entry for
/// each distinct label, preserving the order of `entries`.
pub fn build_candidates<'a, T, I, R, E>(entries: I, render: R, exclude: E) -> CandidateSet<'a, T>
where
    T: 'a,
    I: IntoIterator<Item = &'a T>,
    R: Fn(&T) -> String,
    E: Fn(&str) -> bool,
{
    let candidates = entries
        .into_iter()
        .map(|value| Candidate { label: render(value), value })
        .filter(|c| !exclude(&c.label))
        .unique_by(|c| c.label.clone())
        .collect();
    CandidateSet { candidates }
}

/// Asks `selector` to choose among the labels of `set`.
///
/// An answer that matches no label counts as no selection.
pub fn select_candidate<'a, T, S>(
    set: &CandidateSet<'a, T>,
    prompt: &str,
    selector: &mut S,
) -> Result<Option<&'a T>, EmptyCandidateSet>
where
    S: Selector + ?Sized,
{
    if set.is_empty() {
        return Err(EmptyCandidateSet);
    }
    let labels = set.labels();
    Ok(selector
        .select(prompt, &labels)
        .and_then(|choice| set.find(&choice)))
}
