use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(
    name = "ioc-harvester",
    version,
    about = "Fetch a threat-intel CSV feed and split indicators into per-type files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to config file (TOML). Default: config/ioc_harvester.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Feed URL to fetch instead of the configured one
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Directory receiving the {type}_threats.csv files
    #[arg(long, global = true)]
    pub output_dir: Option<PathBuf>,

    /// Scratch copy of the raw feed
    #[arg(long, global = true)]
    pub scratch: Option<PathBuf>,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Write a JSON run manifest to this path
    #[arg(long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Commit and push the output files after a run
    #[arg(long, global = true)]
    pub publish: bool,

    /// Mirror log output to stdout
    #[arg(long, global = true)]
    pub console: bool,

    /// Increase verbosity (debug, trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch the feed and partition it (default)
    Run,
    /// Commit and push the current output files
    Publish,
    /// Remove duplicate indicator values from existing output files
    Dedupe {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    pub fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            output_dir: self.output_dir.clone(),
            scratch_file: self.scratch.clone(),
            log_file: self.log_file.clone(),
            manifest: self.manifest.clone(),
            publish: self.publish,
        }
    }
}
