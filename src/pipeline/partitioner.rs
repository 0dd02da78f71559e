//! Routes feed rows into one `{type}_threats.csv` file per indicator type.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::config::DedupeStrategy;
use crate::core::error::HarvestError;
use crate::core::record::{IndicatorRecord, HEADERS, MIN_FIELDS};
use crate::core::stats::RunStats;
use crate::pipeline::deduper::{dedupe_file, output_writer};

#[derive(Debug, Clone, Default)]
pub struct PartitionReport {
    /// Output files that received at least one row, sorted.
    pub files: Vec<PathBuf>,
    /// Set when a file-level error stopped the scan early.
    pub aborted: Option<String>,
}

/// Partitions the scratch file into `output_dir`.
///
/// Row-level problems are counted in `stats` and skipped. A file-level error
/// ends the scan; it is logged and returned in the report, never raised.
pub fn partition_feed(
    scratch: &Path,
    output_dir: &Path,
    strategy: DedupeStrategy,
    stats: &mut RunStats,
) -> PartitionReport {
    let mut touched = BTreeSet::new();
    let mut report = PartitionReport::default();

    if let Err(err) = scan(scratch, output_dir, strategy, stats, &mut touched) {
        tracing::error!("partitioning {} aborted: {}", scratch.display(), err);
        report.aborted = Some(err.to_string());
    }

    if strategy == DedupeStrategy::PerRun {
        for path in touched.iter() {
            match dedupe_file(path) {
                Ok(outcome) => stats.duplicates_removed += outcome.removed as u64,
                Err(err) => tracing::error!("dedupe of {} failed: {}", path.display(), err),
            }
        }
    }

    report.files = touched.into_iter().collect();
    tracing::info!(
        "partitioned {} rows into {} files ({} comments, {} malformed, {} duplicates removed)",
        stats.written,
        report.files.len(),
        stats.comments,
        stats.malformed,
        stats.duplicates_removed
    );
    report
}

fn scan(
    scratch: &Path,
    output_dir: &Path,
    strategy: DedupeStrategy,
    stats: &mut RunStats,
    touched: &mut BTreeSet<PathBuf>,
) -> Result<(), HarvestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(scratch)?;
    fs::create_dir_all(output_dir)?;

    for result in reader.records() {
        let row = match result {
            Ok(row) => row,
            Err(err) if err.is_io_error() => return Err(err.into()),
            Err(err) => {
                stats.malformed += 1;
                tracing::warn!("skipping undecodable row: {}", err);
                continue;
            }
        };
        stats.rows_seen += 1;

        if row.get(0).is_some_and(|first| first.starts_with('#')) {
            stats.comments += 1;
            continue;
        }

        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let record = match parse_row(&row, line) {
            Ok(record) => record,
            Err(err) => {
                stats.malformed += 1;
                tracing::warn!("{}", err);
                continue;
            }
        };

        let file_name = output_file_name(&record.ioc_type);
        let path = output_dir.join(&file_name);
        append_record(&path, &record)?;
        stats.record_written(&file_name);
        touched.insert(path.clone());

        if strategy == DedupeStrategy::PerRow {
            let outcome = dedupe_file(&path)?;
            stats.duplicates_removed += outcome.removed as u64;
        }
    }
    Ok(())
}

/// Turns a non-comment CSV row into a record or a [`HarvestError::MalformedRow`].
pub fn parse_row(row: &csv::StringRecord, line: u64) -> Result<IndicatorRecord, HarvestError> {
    if row.len() < MIN_FIELDS {
        return Err(HarvestError::MalformedRow {
            line,
            reason: format!(
                "expected at least {} fields, got {}: {:?}",
                MIN_FIELDS,
                row.len(),
                row.iter().collect::<Vec<_>>()
            ),
        });
    }
    IndicatorRecord::from_fields(row.iter()).ok_or_else(|| HarvestError::MalformedRow {
        line,
        reason: "row could not be parsed".to_string(),
    })
}

/// `{type}_threats.csv`, with path-unsafe characters in the type replaced by `_`.
/// An empty type maps to `_threats.csv`.
pub fn output_file_name(ioc_type: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let re = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("static regex"));
    format!("{}_threats.csv", re.replace_all(ioc_type, "_"))
}

/// Appends one record, writing the header first when the file is new or empty.
pub fn append_record(path: &Path, record: &IndicatorRecord) -> Result<(), HarvestError> {
    let has_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = output_writer(file);
    if !has_content {
        writer.write_record(HEADERS)?;
        tracing::info!("created {}", path.display());
    }
    writer.write_record(record.to_fields())?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_A: &str = "2024-01-01T00:00:00,1,http://evil.com:80,url,botnet,,,2024-01-02T00:00:00,high,ref,tag,false,reporterX";

    fn run(feed: &str, strategy: DedupeStrategy) -> (tempfile::TempDir, RunStats, PartitionReport) {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch.csv");
        fs::write(&scratch, feed).unwrap();
        let mut stats = RunStats::default();
        let report = partition_feed(&scratch, &dir.path().join("out"), strategy, &mut stats);
        (dir, stats, report)
    }

    fn data_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn port_suffix_is_stripped_from_url() {
        let (dir, stats, report) = run(&format!("{SCENARIO_A}\n"), DedupeStrategy::PerRow);
        let path = dir.path().join("out").join("url_threats.csv");
        assert_eq!(report.files, vec![path.clone()]);
        assert!(report.aborted.is_none());

        let rows = data_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][2], "http://evil.com");
        assert_eq!(rows[0][3], "url");
        assert_eq!(rows[0][13], "");
        assert_eq!(stats.written, 1);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(&HEADERS.join(",")));
    }

    #[test]
    fn duplicate_value_is_written_once() {
        let feed = format!("{SCENARIO_A}\n{SCENARIO_A}\n");
        for strategy in [DedupeStrategy::PerRow, DedupeStrategy::PerRun] {
            let (dir, stats, _) = run(&feed, strategy);
            let rows = data_rows(&dir.path().join("out").join("url_threats.csv"));
            assert_eq!(rows.len(), 1, "{strategy:?}");
            assert_eq!(stats.duplicates_removed, 1);
        }
    }

    #[test]
    fn short_rows_are_skipped_without_stopping() {
        let feed = format!("only,two\n{SCENARIO_A}\n");
        let (dir, stats, report) = run(&feed, DedupeStrategy::PerRow);
        assert_eq!(stats.malformed, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(report.files.len(), 1);

        let rows = data_rows(&dir.path().join("out").join("url_threats.csv"));
        assert!(rows.iter().all(|r| r[0] != "only"));
    }

    #[test]
    fn comments_are_never_written() {
        let feed = "# ThreatFox IOCs: recent\n# Last updated: 2024-01-01 00:00:00 UTC\n#\n# \"first_seen_utc\", \"ioc_id\", \"ioc_value\", \"ioc_type\"\n\"2024-01-01 10:00:00\", \"11\", \"1.2.3.4:443\", \"ip:port\", \"botnet_cc\"\n";
        let (dir, stats, _) = run(feed, DedupeStrategy::PerRow);
        assert_eq!(stats.comments, 4);

        let path = dir.path().join("out").join("ip_threats.csv");
        let rows = data_rows(&path);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][1], " 11");
        assert_eq!(rows[0][2], "1.2.3.4");
        assert_eq!(rows[0][3], "ip");
        assert!(!fs::read_to_string(&path).unwrap().contains('#'));
    }

    #[test]
    fn types_get_their_own_files() {
        let feed = "t,1,abc123,md5_hash\nt,2,evil.org,domain\nt,3,def456,md5_hash\n";
        let (dir, stats, report) = run(feed, DedupeStrategy::PerRow);
        assert_eq!(report.files.len(), 2);
        assert_eq!(stats.per_file.get("md5_hash_threats.csv"), Some(&2));
        assert_eq!(data_rows(&dir.path().join("out").join("domain_threats.csv")).len(), 1);
    }

    #[test]
    fn rows_append_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("scratch.csv");
        let out = dir.path().join("out");

        fs::write(&scratch, "t,1,a.com,domain\n").unwrap();
        partition_feed(&scratch, &out, DedupeStrategy::PerRow, &mut RunStats::default());
        fs::write(&scratch, "t,2,b.com,domain\nt,3,a.com,domain\n").unwrap();
        partition_feed(&scratch, &out, DedupeStrategy::PerRow, &mut RunStats::default());

        let rows = data_rows(&out.join("domain_threats.csv"));
        let values: Vec<&str> = rows.iter().map(|r| r[2].as_str()).collect();
        assert_eq!(values, vec!["a.com", "b.com"]);
        assert_eq!(rows[0][1], "1");
    }

    #[test]
    fn four_field_rows_with_empty_parts_are_written() {
        let feed = "t,1,,url\nt,2,evil.org,\nt,3,:8080,ip:port\n";
        let (dir, stats, report) = run(feed, DedupeStrategy::PerRow);
        assert_eq!(stats.malformed, 0);
        assert_eq!(stats.written, 3);
        assert_eq!(report.files.len(), 3);

        let out = dir.path().join("out");
        let url_rows = data_rows(&out.join("url_threats.csv"));
        assert_eq!(url_rows.len(), 1);
        assert_eq!(url_rows[0][2], "");

        let untyped = data_rows(&out.join("_threats.csv"));
        assert_eq!(untyped[0][2], "evil.org");
        assert_eq!(untyped[0][3], "");

        let ip_rows = data_rows(&out.join("ip_threats.csv"));
        assert_eq!(ip_rows[0][2], "");
        assert_eq!(ip_rows[0][3], "ip");
    }

    #[test]
    fn unwritable_output_aborts_rest_of_scan() {
        let feed = "t,1,a.com,url\nt,2,a.com,url\nt,3,evil.org,domain\nt,4,b.com,md5_hash\n";
        for strategy in [DedupeStrategy::PerRow, DedupeStrategy::PerRun] {
            let dir = tempfile::tempdir().unwrap();
            let scratch = dir.path().join("scratch.csv");
            let out = dir.path().join("out");
            fs::write(&scratch, feed).unwrap();
            fs::create_dir_all(out.join("domain_threats.csv")).unwrap();

            let mut stats = RunStats::default();
            let report = partition_feed(&scratch, &out, strategy, &mut stats);

            assert!(report.aborted.is_some(), "{strategy:?}");
            assert_eq!(report.files, vec![out.join("url_threats.csv")]);
            assert_eq!(stats.written, 2);
            assert_eq!(stats.duplicates_removed, 1);
            assert_eq!(data_rows(&out.join("url_threats.csv")).len(), 1);
            assert!(!out.join("md5_hash_threats.csv").exists());
        }
    }

    #[test]
    fn missing_scratch_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let mut stats = RunStats::default();
        let report = partition_feed(
            &dir.path().join("absent.csv"),
            &dir.path().join("out"),
            DedupeStrategy::PerRow,
            &mut stats,
        );
        assert!(report.aborted.is_some());
        assert!(report.files.is_empty());
    }

    #[test]
    fn file_name_cannot_escape_output_dir() {
        assert_eq!(output_file_name("url"), "url_threats.csv");
        assert_eq!(output_file_name("../etc/x"), ".._etc_x_threats.csv");
        assert_eq!(output_file_name("sha256 hash"), "sha256_hash_threats.csv");
    }

    #[test]
    fn quotes_are_removed_from_every_field() {
        let row = csv::StringRecord::from(vec!["\"a\"", "b\"c", "v", "\"t\"", "x\"\""]);
        let record = parse_row(&row, 1).unwrap();
        assert!(record.to_fields().iter().all(|f| !f.contains('"')));
        assert_eq!(record.ioc_type, "t");
    }
}
