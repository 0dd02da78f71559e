use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::core::error::HarvestError;
use crate::core::hash::hash_file;
use crate::core::stats::RunStats;

#[derive(Debug, Clone, Serialize)]
pub struct OutputFileSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub feed_url: String,
    pub feed_sha256: String,
    pub marker: Option<String>,
    pub stats: RunStats,
    pub partition_error: Option<String>,
    pub published: bool,
    pub files: Vec<OutputFileSummary>,
}

/// The line printed on successful completion.
pub fn success_message(marker: Option<&str>) -> String {
    format!(
        "Indicators saved to per-type files\n{}",
        marker.unwrap_or("(no last-updated marker in feed)")
    )
}

pub fn summarize_outputs(files: &[PathBuf]) -> Result<Vec<OutputFileSummary>, HarvestError> {
    let mut out = Vec::new();
    for path in files {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let mut rows = 0usize;
        for record in reader.records() {
            record?;
            rows += 1;
        }
        out.push(OutputFileSummary {
            path: path.clone(),
            rows,
            sha256: hash_file(path)?,
        });
    }
    Ok(out)
}

pub fn write_manifest(manifest: &RunManifest, path: &Path) -> Result<(), HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json)?;
    tracing::info!("run manifest written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_message_includes_marker() {
        let msg = success_message(Some("# Last updated: 2024-01-01 00:00:00 UTC"));
        assert!(msg.ends_with("# Last updated: 2024-01-01 00:00:00 UTC"));
        assert!(success_message(None).contains("no last-updated marker"));
    }

    #[test]
    fn summary_counts_data_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("url_threats.csv");
        fs::write(&path, "h1,h2\na,b\nc,d\n").unwrap();
        let summary = summarize_outputs(&[path]).unwrap();
        assert_eq!(summary[0].rows, 2);
        assert_eq!(summary[0].sha256.len(), 64);
    }
}
