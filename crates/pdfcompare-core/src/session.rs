//! Comparison session state
//!
//! Holds the selected comparison mode, the current file set, cached
//! per-file analyses and the latest results. Every request is stamped with a
//! [`Generation`]; changing the files or the mode starts a new generation, and
//! results carrying an older stamp are discarded instead of overwriting newer
//! state.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::compare::ComparisonOutcome;
use crate::extract::DocumentTextAnalysis;
use crate::overlay::OverlayComparison;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Text similarity and diff
    #[default]
    Semantic,
    /// Page-over-page visual overlay
    Overlay,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Semantic => "semantic",
            Mode::Overlay => "overlay",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(Mode::Semantic),
            "overlay" => Ok(Mode::Overlay),
            other => Err(format!(
                "Invalid mode '{}'. Use: semantic, overlay",
                other
            )),
        }
    }
}

/// Monotonic request stamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

/// What happened to a result handed back to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Current,
    /// The generation moved on while the work was in flight
    Stale,
}

impl Applied {
    pub fn is_current(&self) -> bool {
        matches!(self, Applied::Current)
    }
}

#[derive(Debug, Default)]
pub struct SessionState {
    mode: Mode,
    generation: Generation,
    files: Vec<String>,
    analyses: HashMap<String, DocumentTextAnalysis>,
    comparison: Option<ComparisonOutcome>,
    overlay: Option<OverlayComparison>,
}

impl SessionState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Switch modes. Returns `true` if the mode changed, in which case
    /// in-flight work is invalidated.
    pub fn set_mode(&mut self, mode: Mode) -> bool {
        if self.mode == mode {
            return false;
        }
        debug!(from = %self.mode, to = %mode, "Comparison mode changed");
        self.mode = mode;
        self.invalidate();
        true
    }

    /// Replace the file set. Cached analyses of files no longer present are
    /// dropped along with all results.
    pub fn set_files<I, S>(&mut self, files: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        let files = &self.files;
        self.analyses.retain(|id, _| files.contains(id));
        self.invalidate();
    }

    pub fn add_file(&mut self, file_id: impl Into<String>) {
        let file_id = file_id.into();
        if !self.files.contains(&file_id) {
            self.files.push(file_id);
        }
        self.invalidate();
    }

    /// Returns `true` if the file was part of the session
    pub fn remove_file(&mut self, file_id: &str) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f != file_id);
        self.analyses.remove(file_id);
        let removed = self.files.len() != before;
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Drop results and bump the generation, keeping files and analyses
    pub fn reset(&mut self) {
        self.invalidate();
    }

    /// Forget cached analyses, for when extraction settings change. Results
    /// are dropped too since they were derived from those analyses.
    pub fn clear_analyses(&mut self) {
        self.analyses.clear();
        self.invalidate();
    }

    /// Drop everything, including the file set
    pub fn clear(&mut self) {
        self.files.clear();
        self.analyses.clear();
        self.invalidate();
    }

    /// Stamp a new request. Results for earlier stamps become stale.
    pub fn begin_request(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.generation
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    fn invalidate(&mut self) {
        self.comparison = None;
        self.overlay = None;
        self.begin_request();
    }

    fn check(&self, generation: Generation, what: &str) -> Applied {
        if self.is_current(generation) {
            Applied::Current
        } else {
            warn!(
                stale = generation.0,
                current = self.generation.0,
                "Discarding stale {}",
                what
            );
            Applied::Stale
        }
    }

    /// Cache an analysis for a file that is still in the session
    pub fn record_analysis(
        &mut self,
        generation: Generation,
        file_id: &str,
        analysis: DocumentTextAnalysis,
    ) -> Applied {
        let applied = self.check(generation, "analysis");
        if !applied.is_current() {
            return applied;
        }
        if !self.files.iter().any(|f| f == file_id) {
            warn!(file = file_id, "Discarding analysis for removed file");
            return Applied::Stale;
        }
        self.analyses.insert(file_id.to_string(), analysis);
        Applied::Current
    }

    pub fn cached_analysis(&self, file_id: &str) -> Option<&DocumentTextAnalysis> {
        self.analyses.get(file_id)
    }

    pub fn record_comparison(&mut self, generation: Generation, outcome: ComparisonOutcome) -> Applied {
        let applied = self.check(generation, "comparison");
        if applied.is_current() {
            self.comparison = Some(outcome);
        }
        applied
    }

    pub fn record_overlay(&mut self, generation: Generation, overlay: OverlayComparison) -> Applied {
        let applied = self.check(generation, "overlay");
        if applied.is_current() {
            self.overlay = Some(overlay);
        }
        applied
    }

    pub fn comparison(&self) -> Option<&ComparisonOutcome> {
        self.comparison.as_ref()
    }

    pub fn overlay(&self) -> Option<&OverlayComparison> {
        self.overlay.as_ref()
    }
}
