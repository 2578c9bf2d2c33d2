//! File-based artifacts: one JSON array of commit metrics per repository.

use crate::config::Config;
use crate::error::{MetricsError, Result};
use crate::git::GitRepo;
use crate::ingest::{extract_repository, IngestReport, RepoOutcome};
use crate::model::CommitMetric;
use crate::store::MetricsStore;
use anyhow::Context;
use console::style;
use indicatif::ProgressBar;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Records read from one artifact. Entries that failed to parse or validate
/// are counted, not returned.
#[derive(Debug, Default)]
pub struct Artifact {
    pub repository: String,
    pub metrics: Vec<CommitMetric>,
    pub skipped: usize,
}

pub fn artifact_path(dir: &Path, repository: &str) -> PathBuf {
    dir.join(format!("{repository}.json"))
}

pub fn write_artifact(dir: &Path, repository: &str, metrics: &[CommitMetric]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = artifact_path(dir, repository);
    std::fs::write(&path, serde_json::to_string_pretty(metrics)?)?;
    Ok(path)
}

/// Reads an artifact. Records without a repository tag take the file stem.
pub fn read_artifact(path: &Path) -> Result<Artifact> {
    let repository = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<Value> = serde_json::from_str(&content)?;

    let mut artifact = Artifact {
        repository,
        ..Artifact::default()
    };
    for (index, entry) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<CommitMetric>(entry)
            .map_err(MetricsError::from)
            .and_then(|mut metric| {
                if metric.repository.is_empty() {
                    metric.repository = artifact.repository.clone();
                }
                metric.validate()?;
                Ok(metric)
            });
        match parsed {
            Ok(metric) => artifact.metrics.push(metric),
            Err(e) => {
                warn!(path = %path.display(), index, "skipping malformed record: {e}");
                artifact.skipped += 1;
            }
        }
    }
    Ok(artifact)
}

/// `*.json` files directly inside `dir`, sorted.
pub fn artifact_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads artifacts into the store, one outcome per file.
pub fn load_artifacts(store: &mut MetricsStore, files: &[PathBuf]) -> IngestReport {
    let mut report = IngestReport::default();
    for file in files {
        let outcome = match read_artifact(file) {
            Ok(artifact) => match store.bulk_insert(&artifact.metrics) {
                Ok(written) => {
                    info!(path = %file.display(), written, "loaded artifact");
                    RepoOutcome {
                        repository: artifact.repository,
                        written,
                        skipped: artifact.skipped,
                        error: None,
                    }
                }
                Err(e) => RepoOutcome {
                    repository: artifact.repository,
                    written: 0,
                    skipped: artifact.skipped,
                    error: Some(e.to_string()),
                },
            },
            Err(e) => RepoOutcome {
                repository: file.display().to_string(),
                written: 0,
                skipped: 0,
                error: Some(e.to_string()),
            },
        };
        report.repositories.push(outcome);
    }
    report
}

pub fn exec_export(config: &Config, repo: Option<PathBuf>, from_store: bool, out: Option<PathBuf>) -> anyhow::Result<()> {
    let out_dir = out.unwrap_or_else(|| config.metrics_dir.clone());

    if from_store {
        let store = MetricsStore::open(&config.database).context("Failed to open metrics store")?;
        for repository in store.repositories()? {
            let metrics: Vec<CommitMetric> = store
                .by_repository(&repository)?
                .into_iter()
                .map(|s| s.metric)
                .collect();
            let path = write_artifact(&out_dir, &repository, &metrics)?;
            println!("{} {} ({} commits)", style("wrote").green(), path.display(), metrics.len());
        }
        return Ok(());
    }

    let repo_path = repo.context("Either a repository path or --from-store is required")?;
    let repo = GitRepo::open(&repo_path).context("Failed to open git repository")?;
    let extracted = extract_repository(&repo, &ProgressBar::hidden())
        .with_context(|| format!("Failed to extract commits from {}", repo.name()))?;
    let path = write_artifact(&out_dir, repo.name(), &extracted.metrics)?;

    println!(
        "{} {} ({} commits, {} skipped)",
        style("wrote").green(),
        path.display(),
        extracted.metrics.len(),
        extracted.skipped
    );
    Ok(())
}

pub fn exec_load(config: &Config, files: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    let files = if files.is_empty() {
        artifact_files(&config.metrics_dir)
            .with_context(|| format!("Failed to list artifacts in {}", config.metrics_dir.display()))?
    } else {
        files
    };

    let mut store = MetricsStore::open(&config.database).context("Failed to open metrics store")?;
    let report = load_artifacts(&mut store, &files);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for r in &report.repositories {
            match &r.error {
                None => println!("{} {}: {} written, {} skipped", style("✔").green(), r.repository, r.written, r.skipped),
                Some(e) => println!("{} {}: {}", style("✘").red(), r.repository, e),
            }
        }
    }
    Ok(())
}
