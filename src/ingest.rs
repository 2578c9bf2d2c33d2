use crate::config::Config;
use crate::error::{MetricsError, Result};
use crate::git::GitRepo;
use crate::model::CommitMetric;
use crate::normalize::normalize;
use crate::store::MetricsStore;
use anyhow::Context;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions {
    /// Drop the repository's stored records before inserting the fresh ones
    pub refresh: bool,
    pub progress: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoOutcome {
    pub repository: String,
    pub written: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepoOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub repositories: Vec<RepoOutcome>,
}

impl IngestReport {
    pub fn succeeded(&self) -> usize {
        self.repositories.iter().filter(|r| r.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.repositories.len() - self.succeeded()
    }

    pub fn total_written(&self) -> usize {
        self.repositories.iter().map(|r| r.written).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.repositories.iter().map(|r| r.skipped).sum()
    }
}

/// Metrics extracted from one repository, with the count of commits dropped
/// for failing validation.
#[derive(Debug, Default)]
pub struct Extracted {
    pub metrics: Vec<CommitMetric>,
    pub skipped: usize,
}

/// Immediate subdirectories of `dir`, sorted by name.
pub fn discover_repositories(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut repos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            repos.push(path);
        }
    }
    repos.sort();
    Ok(repos)
}

fn spinner(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} ({pos}/{len} commits)")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb
}

/// Walks the repository's non-merge history and normalizes every commit.
/// Command failures abort this repository; bad records are skipped.
pub fn extract_repository(repo: &GitRepo, pb: &ProgressBar) -> Result<Extracted> {
    let mut extracted = Extracted::default();
    let history = repo.history()?;
    pb.set_length(history.remaining() as u64);
    pb.set_message(format!("Reading {}", repo.name()));

    for raw in history {
        let raw = raw?;
        let hash = raw.hash.clone();
        match normalize(raw, repo.name()) {
            Ok(metric) => extracted.metrics.push(metric),
            Err(e) => {
                warn!(repository = repo.name(), commit = %hash, "skipping commit: {e}");
                extracted.skipped += 1;
            }
        }
        pb.inc(1);
    }

    Ok(extracted)
}

fn ingest_one(store: &mut MetricsStore, path: &Path, options: IngestOptions, pb: &ProgressBar) -> Result<RepoOutcome> {
    let repo = GitRepo::open(path)?;
    let extracted = extract_repository(&repo, pb)?;

    if options.refresh {
        let removed = store.clear_repository(repo.name())?;
        info!(repository = repo.name(), removed, "cleared stored commits");
    }
    let written = if extracted.metrics.is_empty() {
        0
    } else {
        store.bulk_insert(&extracted.metrics)?
    };

    info!(repository = repo.name(), written, skipped = extracted.skipped, "ingested repository");
    Ok(RepoOutcome {
        repository: repo.name().to_string(),
        written,
        skipped: extracted.skipped,
        error: None,
    })
}

fn repository_label(path: &Path, err: &MetricsError) -> String {
    match err {
        MetricsError::Extraction { repository, .. } => repository.clone(),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string()),
    }
}

/// Processes repositories one after another. A failing repository is logged
/// and recorded; the rest still run.
pub fn ingest_all(store: &mut MetricsStore, paths: &[PathBuf], options: IngestOptions) -> IngestReport {
    let pb = spinner(options.progress);
    let mut report = IngestReport::default();

    for path in paths {
        let outcome = match ingest_one(store, path, options, &pb) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(path = %path.display(), "failed to ingest repository: {e}");
                RepoOutcome {
                    repository: repository_label(path, &e),
                    written: 0,
                    skipped: 0,
                    error: Some(e.to_string()),
                }
            }
        };
        report.repositories.push(outcome);
    }

    pb.finish_and_clear();
    report
}

pub fn exec(config: &Config, paths: Vec<PathBuf>, refresh: bool, json: bool) -> anyhow::Result<()> {
    let paths = if paths.is_empty() {
        discover_repositories(&config.repos_dir).with_context(|| {
            format!("Failed to list repositories in {}", config.repos_dir.display())
        })?
    } else {
        paths
    };

    if paths.is_empty() {
        anyhow::bail!("No repositories found in {}", config.repos_dir.display());
    }

    let mut store = MetricsStore::open(&config.database).context("Failed to open metrics store")?;
    let report = ingest_all(
        &mut store,
        &paths,
        IngestOptions {
            refresh,
            progress: !json,
        },
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output_summary(&report);
    }

    Ok(())
}

fn output_summary(report: &IngestReport) {
    println!(
        "{:<40} {:>8} {:>8}  {}",
        style("Repository").bold(),
        style("Written").bold(),
        style("Skipped").bold(),
        style("Status").bold()
    );
    println!("{}", "─".repeat(72));
    for r in &report.repositories {
        let status = match &r.error {
            None => style("ok".to_string()).green(),
            Some(e) => style(e.clone()).red(),
        };
        println!("{:<40} {:>8} {:>8}  {}", r.repository, r.written, r.skipped, status);
    }
    println!(
        "\nRepositories: {} ok, {} failed",
        style(report.succeeded()).green(),
        style(report.failed()).red()
    );
    println!(
        "Commits written: {}, skipped: {}",
        style(report.total_written()).cyan(),
        style(report.total_skipped()).yellow()
    );
}
