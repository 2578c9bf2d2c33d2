//! Cloning repositories listed in a JSON manifest into the repos directory,
//! and keeping those clones up to date.

use crate::config::Config;
use crate::error::{MetricsError, Result};
use crate::git::GitRepo;
use crate::ingest::discover_repositories;
use anyhow::Context;
use console::style;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum CloneOutcome {
    Cloned { name: String, path: PathBuf },
    Exists { name: String },
    Invalid { url: String },
    Failed { name: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum PullOutcome {
    Updated { name: String, from: Option<String>, to: String },
    UpToDate { name: String },
    Failed { name: String, error: String },
}

pub fn read_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// `https://github.com/user/repo.git` -> `repo`. Other URLs are rejected.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let rest = url.strip_prefix("https://github.com/")?;
    let name = rest.strip_suffix(".git")?.rsplit('/').next()?;
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn git_clone(url: &str, target: &Path) -> Result<()> {
    let output = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(url)
        .arg(target)
        .output()?;
    if !output.status.success() {
        return Err(MetricsError::extraction(
            url,
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }
    Ok(())
}

/// Clones each manifest entry into `repos_dir`, one at a time.
pub fn clone_all(entries: &[ManifestEntry], repos_dir: &Path) -> Result<Vec<CloneOutcome>> {
    std::fs::create_dir_all(repos_dir)?;
    let mut outcomes = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(name) = repo_name_from_url(&entry.url) else {
            warn!(url = %entry.url, "skipping invalid repository URL");
            outcomes.push(CloneOutcome::Invalid { url: entry.url.clone() });
            continue;
        };

        let target = repos_dir.join(&name);
        if target.exists() {
            info!(repository = %name, "already cloned");
            outcomes.push(CloneOutcome::Exists { name });
            continue;
        }

        info!(repository = %name, url = %entry.url, "cloning");
        let outcome = match git_clone(&entry.url, &target) {
            Ok(()) => CloneOutcome::Cloned { name, path: target },
            Err(e) => {
                error!(repository = %name, "clone failed: {e}");
                CloneOutcome::Failed {
                    name,
                    error: e.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }

    Ok(outcomes)
}

fn pull_one(path: &Path) -> Result<PullOutcome> {
    let repo = GitRepo::open(path)?;
    let name = repo.name().to_string();
    let before = repo.head();
    repo.pull()?;

    Ok(match repo.head() {
        Some(after) if before.as_deref() != Some(after.as_str()) => PullOutcome::Updated {
            name,
            from: before,
            to: after,
        },
        _ => PullOutcome::UpToDate { name },
    })
}

/// Fast-forwards every clone under `repos_dir`, one at a time. A failing
/// repository is recorded and the rest still run.
pub fn pull_all(repos_dir: &Path) -> Result<Vec<PullOutcome>> {
    let mut outcomes = Vec::new();
    for path in discover_repositories(repos_dir)? {
        let outcome = match pull_one(&path) {
            Ok(outcome) => {
                info!(path = %path.display(), ?outcome, "pulled");
                outcome
            }
            Err(e) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                error!(repository = %name, "pull failed: {e}");
                PullOutcome::Failed {
                    name,
                    error: e.to_string(),
                }
            }
        };
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

/// Removes the whole repos directory. Returns false when it did not exist.
pub fn clean(repos_dir: &Path) -> Result<bool> {
    if !repos_dir.exists() {
        return Ok(false);
    }
    std::fs::remove_dir_all(repos_dir)?;
    Ok(true)
}

pub fn exec(config: &Config, manifest: &Path, json: bool) -> anyhow::Result<()> {
    let entries = read_manifest(manifest)
        .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
    if entries.is_empty() {
        anyhow::bail!("No repositories listed in {}", manifest.display());
    }

    let outcomes = clone_all(&entries, &config.repos_dir).context("Failed to prepare repos directory")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }
    for outcome in &outcomes {
        match outcome {
            CloneOutcome::Cloned { name, path } => {
                println!("{} {} -> {}", style("cloned").green(), name, path.display())
            }
            CloneOutcome::Exists { name } => println!("{} {}", style("exists").yellow(), name),
            CloneOutcome::Invalid { url } => println!("{} {}", style("invalid").red(), url),
            CloneOutcome::Failed { name, error } => println!("{} {}: {}", style("failed").red(), name, error),
        }
    }
    Ok(())
}

pub fn exec_pull(config: &Config, json: bool) -> anyhow::Result<()> {
    let outcomes = pull_all(&config.repos_dir)
        .with_context(|| format!("Failed to list repositories in {}", config.repos_dir.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }
    if outcomes.is_empty() {
        println!("No repositories in {}", config.repos_dir.display());
    }
    for outcome in &outcomes {
        match outcome {
            PullOutcome::Updated { name, to, .. } => {
                println!("{} {} -> {}", style("updated").green(), name, &to[..to.len().min(12)])
            }
            PullOutcome::UpToDate { name } => println!("{} {}", style("up to date").dim(), name),
            PullOutcome::Failed { name, error } => println!("{} {}: {}", style("failed").red(), name, error),
        }
    }
    Ok(())
}

pub fn exec_clean(config: &Config) -> anyhow::Result<()> {
    if clean(&config.repos_dir).context("Failed to delete repos directory")? {
        println!("Deleted {}", config.repos_dir.display());
    } else {
        println!("No {} directory to delete", config.repos_dir.display());
    }
    Ok(())
}
