use super::parse::{parse_change_report, parse_log, LogEntry, LOG_FORMAT};
use crate::error::{MetricsError, Result};
use crate::model::{ChangeReport, RawCommit};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const STAT_WIDTH: &str = "--stat=1000,1000";

pub struct GitRepo {
    path: PathBuf,
    name: String,
    has_commits: bool,
}

impl GitRepo {
    /// Open the repository whose worktree (or `.git` dir) is exactly `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let requested = path.as_ref();
        let label = requested
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| requested.display().to_string());

        if !requested.exists() {
            return Err(MetricsError::extraction(
                label,
                format!("repository path {} does not exist", requested.display()),
            ));
        }

        let repo = gix::open(requested)
            .map_err(|e| MetricsError::extraction(&label, format!("not a git repository: {e}")))?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or(label);
        let has_commits = repo.head_id().is_ok();

        Ok(Self { path, name, has_commits })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Repository tag derived from the worktree directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        debug!(repository = %self.name, ?args, "running git");
        let output = Command::new("git")
            .args(["-c", "core.quotePath=false"])
            .arg("-C")
            .arg(&self.path)
            .args(args)
            .output()
            .map_err(|e| MetricsError::extraction(&self.name, format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MetricsError::extraction(
                &self.name,
                format!("git {} exited with {}: {}", args.join(" "), output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Structured, non-merge log of HEAD, newest first.
    pub fn log(&self) -> Result<Vec<LogEntry>> {
        if !self.has_commits {
            return Ok(Vec::new());
        }
        let output = self.run_git(&["log", LOG_FORMAT, "--no-merges"])?;
        Ok(parse_log(&output))
    }

    /// File/line change report for a single commit.
    pub fn change_report(&self, hash: &str) -> Result<ChangeReport> {
        let output = self.run_git(&["show", hash, "--pretty=format:", STAT_WIDTH, "--no-renames"])?;
        Ok(parse_change_report(&output))
    }

    /// Current `HEAD` commit, or `None` on an unborn branch.
    pub fn head(&self) -> Option<String> {
        self.run_git(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .ok()
            .map(|out| out.trim().to_string())
            .filter(|hash| !hash.is_empty())
    }

    /// Fast-forwards the checked out branch from its upstream.
    pub fn pull(&self) -> Result<()> {
        self.run_git(&["pull", "--ff-only", "--quiet"])?;
        Ok(())
    }

    /// Lazily walks history. The log runs now, each `git show` runs as the
    /// iterator advances. Call again to restart from the newest commit.
    pub fn history(&self) -> Result<History<'_>> {
        let entries = self.log()?;
        Ok(History {
            repo: self,
            entries: entries.into_iter(),
        })
    }
}

pub struct History<'a> {
    repo: &'a GitRepo,
    entries: std::vec::IntoIter<LogEntry>,
}

impl History<'_> {
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }
}

impl Iterator for History<'_> {
    type Item = Result<RawCommit>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.entries.by_ref().find(|e| !e.is_merge())?;
        Some(self.repo.change_report(&entry.hash).map(|report| RawCommit {
            hash: entry.hash,
            parents: entry.parents,
            author_name: entry.author_name,
            author_email: entry.author_email,
            date: entry.date,
            report,
        }))
    }
}
