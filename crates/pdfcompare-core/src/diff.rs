//! Character, word and array diff primitives
//!
//! Each primitive returns an ordered list of [`DiffPart`]s. Adjacent changes of
//! the same kind are merged into one part, and within a replacement the
//! removed part always precedes the added part.

use std::hash::Hash;

use serde::{Deserialize, Serialize};
use similar::{capture_diff_slices, Algorithm, DiffTag};

use crate::normalize::{count_words, diff_tokens};

/// One run of unchanged, added or removed content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPart<V = String> {
    pub value: V,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub added: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub removed: bool,
}

impl<V> DiffPart<V> {
    pub fn is_unchanged(&self) -> bool {
        !self.added && !self.removed
    }
}

/// Word-level change counts derived from a word diff
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub unchanged: usize,
    /// Share of changed words, 0-100
    pub change_percentage: u32,
}

impl ChangeSummary {
    pub fn total(&self) -> usize {
        self.added + self.removed + self.unchanged
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Unchanged,
    Added,
    Removed,
}

/// Diff two slices and group the edit script into parts, building each
/// part's value from the run of items it covers
fn diff_slices<'a, T, V>(old: &'a [T], new: &'a [T], build: impl Fn(&[&'a T]) -> V) -> Vec<DiffPart<V>>
where
    T: Hash + Eq + Ord,
{
    let mut runs: Vec<(Kind, Vec<&'a T>)> = Vec::new();
    let mut push = |kind: Kind, items: &'a [T]| {
        if items.is_empty() {
            return;
        }
        match runs.last_mut() {
            Some((last, run)) if *last == kind => run.extend(items.iter()),
            _ => runs.push((kind, items.iter().collect())),
        }
    };

    for op in capture_diff_slices(Algorithm::Myers, old, new) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => push(Kind::Unchanged, &old[old_range]),
            DiffTag::Delete => push(Kind::Removed, &old[old_range]),
            DiffTag::Insert => push(Kind::Added, &new[new_range]),
            DiffTag::Replace => {
                push(Kind::Removed, &old[old_range]);
                push(Kind::Added, &new[new_range]);
            }
        }
    }

    runs.into_iter()
        .map(|(kind, items)| DiffPart {
            value: build(&items),
            added: kind == Kind::Added,
            removed: kind == Kind::Removed,
        })
        .collect()
}

/// Character-level diff
pub fn diff_chars(old: &str, new: &str) -> Vec<DiffPart> {
    let old: Vec<char> = old.chars().collect();
    let new: Vec<char> = new.chars().collect();
    diff_slices(&old, &new, |run| run.iter().copied().collect())
}

/// Word-level diff over word, whitespace and punctuation tokens
pub fn diff_words(old: &str, new: &str) -> Vec<DiffPart> {
    let old = diff_tokens(old);
    let new = diff_tokens(new);
    diff_slices(&old, &new, |run| run.iter().map(|t| **t).collect())
}

/// Diff two lists item by item
pub fn diff_arrays(old: &[String], new: &[String]) -> Vec<DiffPart<Vec<String>>> {
    diff_slices(old, new, |run| run.iter().map(|s| (*s).clone()).collect())
}

/// Count whitespace-delimited words per part into a [`ChangeSummary`]
pub fn summarize_word_changes(parts: &[DiffPart]) -> ChangeSummary {
    let mut summary = ChangeSummary::default();
    for part in parts {
        let words = count_words(&part.value);
        if part.added {
            summary.added += words;
        } else if part.removed {
            summary.removed += words;
        } else {
            summary.unchanged += words;
        }
    }

    let total = summary.total();
    summary.change_percentage = if total == 0 {
        0
    } else {
        ((summary.added + summary.removed) as f64 / total as f64 * 100.0).round() as u32
    };
    summary
}

/// Number of inserted plus deleted characters in a character diff
pub fn changed_char_count(parts: &[DiffPart]) -> usize {
    parts
        .iter()
        .filter(|p| !p.is_unchanged())
        .map(|p| p.value.chars().count())
        .sum()
}
