//! Cross-round bookkeeping: every conflict set found so far and the execution logs of the
//! rounds that produced them.

use crate::mods::set::ModSet;
use crate::search::engine::CompletedTest;
use serde::Serialize;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SearchArchive {
    found_conflict_sets: Vec<ModSet>,
    archived_log: Vec<CompletedTest>,
}

impl SearchArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a round's conflict set. Empty sets are not worth keeping.
    pub fn add_found_conflict_set(&mut self, conflict_set: ModSet) {
        if !conflict_set.is_empty() {
            self.found_conflict_sets.push(conflict_set);
        }
    }

    /// Append a finished round's execution log.
    pub fn append_log(&mut self, log: &[CompletedTest]) {
        self.archived_log.extend_from_slice(log);
    }

    pub fn found_conflict_sets(&self) -> &[ModSet] {
        &self.found_conflict_sets
    }

    pub fn archived_log(&self) -> &[CompletedTest] {
        &self.archived_log
    }
}
