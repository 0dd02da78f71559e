use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::PublishConfig;
use crate::core::error::HarvestError;
use crate::core::time::fallback_commit_message;

/// Exit status and stderr of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub code: i32,
    pub stderr: String,
}

impl GitOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

pub trait GitRunner {
    fn run(&mut self, repo_dir: &Path, args: &[&str]) -> Result<GitOutput, HarvestError>;
}

/// Runs the `git` binary found on `PATH`.
pub struct SystemGit;

impl GitRunner for SystemGit {
    fn run(&mut self, repo_dir: &Path, args: &[&str]) -> Result<GitOutput, HarvestError> {
        let output = Command::new("git")
            .current_dir(repo_dir)
            .args(args)
            .output()?;
        Ok(GitOutput {
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

pub struct Publisher<R: GitRunner> {
    runner: R,
    repo_dir: PathBuf,
    remote: String,
    branch: String,
}

impl Publisher<SystemGit> {
    pub fn from_config(config: &PublishConfig) -> Self {
        Self::with_runner(SystemGit, config)
    }
}

impl<R: GitRunner> Publisher<R> {
    pub fn with_runner(runner: R, config: &PublishConfig) -> Self {
        Self {
            runner,
            repo_dir: config.repo_dir.clone(),
            remote: config.remote.clone(),
            branch: config.branch.clone(),
        }
    }

    /// Stages everything, commits and pushes. Stops at the first failing step.
    /// Returns the commit message that was used.
    pub fn publish(&mut self, marker: Option<&str>) -> Result<String, HarvestError> {
        let message = match marker {
            Some(m) if !m.trim().is_empty() => m.to_string(),
            _ => fallback_commit_message(),
        };

        self.step("add", &["add", "."])?;
        self.step("commit", &["commit", "-m", &message])?;
        let remote = self.remote.clone();
        let branch = self.branch.clone();
        self.step("push", &["push", &remote, &branch])?;

        tracing::info!("published to {}/{}: {}", remote, branch, message);
        Ok(message)
    }

    pub fn into_runner(self) -> R {
        self.runner
    }

    fn step(&mut self, name: &str, args: &[&str]) -> Result<(), HarvestError> {
        let output = self
            .runner
            .run(&self.repo_dir, args)
            .map_err(|e| HarvestError::Publish {
                step: name.to_string(),
                code: -1,
                stderr: e.to_string(),
            })?;
        if !output.success() {
            let err = HarvestError::Publish {
                step: name.to_string(),
                code: output.code,
                stderr: output.stderr,
            };
            tracing::error!("{}", err);
            return Err(err);
        }
        Ok(())
    }
}
