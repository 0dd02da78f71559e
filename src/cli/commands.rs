use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::cli::flags::{Cli, Command};
use crate::config::{apply_overrides, load_config, AppConfig};
use crate::core::error::HarvestError;
use crate::core::hash::sha256_hex;
use crate::core::logger::{init_tracing, LogOptions};
use crate::core::stats::RunStats;
use crate::core::time::now_utc;
use crate::pipeline::deduper::dedupe_file;
use crate::pipeline::fetcher::FeedFetcher;
use crate::pipeline::partitioner::{partition_feed, PartitionReport};
use crate::pipeline::publisher::Publisher;
use crate::pipeline::reporter::{
    success_message, summarize_outputs, write_manifest, RunManifest,
};
use crate::pipeline::staging::{extract_last_updated, write_scratch};

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub marker: Option<String>,
    pub stats: RunStats,
    pub report: PartitionReport,
    pub published: bool,
}

/// Entry point used by the binary: config, logging, then the chosen command.
/// Every error is logged before it is returned.
pub fn execute(cli: &Cli) -> Result<()> {
    let overrides = cli.overrides();
    let cfg = match load_config(cli.config.as_deref()) {
        Ok(cfg) => apply_overrides(cfg, &overrides),
        Err(err) => {
            let fallback = apply_overrides(AppConfig::default(), &overrides);
            init_logging(cli, &fallback)?;
            tracing::error!("{}", err);
            return Err(err.into());
        }
    };
    init_logging(cli, &cfg)?;

    let result = dispatch(&cli.command(), &cfg);
    if let Err(err) = &result {
        tracing::error!("run failed: {:#}", err);
    }
    result
}

fn init_logging(cli: &Cli, cfg: &AppConfig) -> Result<()> {
    init_tracing(&LogOptions {
        path: &cfg.paths.log_file,
        verbose: cli.verbose,
        console: cli.console,
    })?;
    Ok(())
}

fn dispatch(command: &Command, cfg: &AppConfig) -> Result<()> {
    match command {
        Command::Run => {
            let outcome = run_pipeline(cfg)?;
            println!("{}", success_message(outcome.marker.as_deref()));
            Ok(())
        }
        Command::Publish => {
            let message = run_publish(cfg)?;
            println!("Published: {message}");
            Ok(())
        }
        Command::Dedupe { files } => run_dedupe(files),
    }
}

/// Fetch, stage, partition and (if enabled) publish. Only fetch and staging
/// failures are returned; everything later is logged and folded into the outcome.
pub fn run_pipeline(cfg: &AppConfig) -> Result<RunOutcome> {
    let started_at = now_utc();
    let fetcher = FeedFetcher::new(&cfg.feed)?;
    let body = fetcher.fetch(&cfg.feed.url)?;

    let scratch = &cfg.paths.scratch_file;
    write_scratch(&body, scratch)?;
    let marker = read_marker(scratch);

    let mut stats = RunStats::default();
    let report = partition_feed(scratch, &cfg.paths.output_dir, cfg.dedupe, &mut stats);

    let published = if cfg.publish.enabled {
        match Publisher::from_config(&cfg.publish).publish(marker.as_deref()) {
            Ok(_) => true,
            Err(err) => {
                tracing::error!("publish step failed, output files kept: {}", err);
                false
            }
        }
    } else {
        tracing::debug!("publish disabled");
        false
    };

    let outcome = RunOutcome {
        marker,
        stats,
        report,
        published,
    };

    if let Some(path) = &cfg.paths.manifest {
        if let Err(err) = persist_manifest(cfg, &outcome, &body, started_at, path) {
            tracing::warn!("could not write run manifest: {}", err);
        }
    }

    Ok(outcome)
}

/// Publishes whatever is in the repository now, using the marker of the last scratch file.
pub fn run_publish(cfg: &AppConfig) -> Result<String> {
    let marker = read_marker(&cfg.paths.scratch_file);
    let message = Publisher::from_config(&cfg.publish).publish(marker.as_deref())?;
    Ok(message)
}

fn run_dedupe(files: &[PathBuf]) -> Result<()> {
    for path in files {
        if !path.is_file() {
            return Err(HarvestError::Config(format!("no such file: {}", path.display())).into());
        }
        let outcome = dedupe_file(path)?;
        tracing::info!(
            "{}: kept {}, removed {}",
            path.display(),
            outcome.kept,
            outcome.removed
        );
        println!(
            "{}: kept {}, removed {}",
            path.display(),
            outcome.kept,
            outcome.removed
        );
    }
    Ok(())
}

fn read_marker(scratch: &Path) -> Option<String> {
    match extract_last_updated(scratch) {
        Ok(marker) => Some(marker),
        Err(err) => {
            tracing::warn!("{}", err);
            None
        }
    }
}

fn persist_manifest(
    cfg: &AppConfig,
    outcome: &RunOutcome,
    body: &str,
    started_at: chrono::DateTime<chrono::Utc>,
    path: &Path,
) -> Result<()> {
    let manifest = RunManifest {
        version: env!("CARGO_PKG_VERSION").to_string(),
        started_at,
        finished_at: now_utc(),
        feed_url: cfg.feed.url.clone(),
        feed_sha256: sha256_hex(body.as_bytes()),
        marker: outcome.marker.clone(),
        stats: outcome.stats.clone(),
        partition_error: outcome.report.aborted.clone(),
        published: outcome.published,
        files: summarize_outputs(&outcome.report.files)?,
    };
    write_manifest(&manifest, path)?;
    Ok(())
}
