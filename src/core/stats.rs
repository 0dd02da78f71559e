use std::collections::BTreeMap;

use serde::Serialize;

/// Counters a run accumulates. Stages take it by `&mut` next to their inputs.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct RunStats {
    pub rows_seen: u64,
    pub comments: u64,
    pub malformed: u64,
    pub written: u64,
    pub duplicates_removed: u64,
    /// Rows appended per output file name.
    pub per_file: BTreeMap<String, u64>,
}

impl RunStats {
    pub fn record_written(&mut self, file_name: &str) {
        self.written += 1;
        *self.per_file.entry(file_name.to_string()).or_insert(0) += 1;
    }
}
