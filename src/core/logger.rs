use std::{fs, path::Path};

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::core::error::HarvestError;

/// Log files larger than this are moved aside to `<name>.log.1` at startup.
pub const ROTATE_BYTES: u64 = 1_000_000;

pub struct LogOptions<'a> {
    pub path: &'a Path,
    pub verbose: u8,
    /// Mirror log events to stdout.
    pub console: bool,
}

pub fn init_tracing(opts: &LogOptions<'_>) -> Result<(), HarvestError> {
    let level = match opts.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file = open_log_file(opts.path)?;
    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(false);

    let stdout_layer = opts
        .console
        .then(|| fmt::layer().with_writer(std::io::stdout).with_target(false));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| HarvestError::Config(e.to_string()))
}

/// Opens the log in append mode, creating its directory and rotating it first.
pub fn open_log_file(path: &Path) -> Result<fs::File, HarvestError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    rotate_if_large(path, ROTATE_BYTES);
    let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    Ok(file)
}

fn rotate_if_large(path: &Path, limit: u64) {
    if let Ok(meta) = fs::metadata(path) {
        if meta.len() > limit {
            let rotated = path.with_extension("log.1");
            let _ = fs::rename(path, rotated);
        }
    }
}
