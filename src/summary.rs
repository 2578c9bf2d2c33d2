use crate::artifact::{artifact_files, read_artifact};
use crate::config::Config;
use crate::error::Result;
use crate::model::CommitMetric;
use anyhow::Context;
use console::style;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorCommitCount {
    pub author: String,
    pub commit_count: u64,
}

/// Commit count per author name, in first-seen order.
pub fn summarize(metrics: &[CommitMetric]) -> Vec<AuthorCommitCount> {
    let mut counts: IndexMap<&str, u64> = IndexMap::new();
    for m in metrics {
        *counts.entry(m.author.name.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(author, commit_count)| AuthorCommitCount {
            author: author.to_string(),
            commit_count,
        })
        .collect()
}

/// Writes `<out_dir>/<repository>_summary.json` for one artifact.
pub fn write_summary(artifact: &Path, out_dir: &Path) -> Result<PathBuf> {
    let artifact = read_artifact(artifact)?;
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(format!("{}_summary.json", artifact.repository));
    std::fs::write(&path, serde_json::to_string_pretty(&summarize(&artifact.metrics))?)?;
    Ok(path)
}

pub fn exec(config: &Config) -> anyhow::Result<()> {
    let files = artifact_files(&config.metrics_dir)
        .with_context(|| format!("Failed to list artifacts in {}", config.metrics_dir.display()))?;

    let mut failed = 0;
    for file in &files {
        match write_summary(file, &config.summaries_dir) {
            Ok(path) => println!("{} {}", style("Summary created:").green(), path.display()),
            Err(e) => {
                error!(path = %file.display(), "failed to summarize artifact: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        println!("{} of {} artifacts could not be summarized", style(failed).red(), files.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::write_artifact;
    use crate::model::{Author, LineStats};
    use chrono::DateTime;

    fn by(author: &str, id: &str) -> CommitMetric {
        CommitMetric {
            repository: "demo".to_string(),
            commit_id: id.to_string(),
            parent_commits: vec![],
            author: Author {
                name: author.to_string(),
                email: String::new(),
            },
            date: DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
            files: Default::default(),
            lines: LineStats::default(),
        }
    }

    #[test]
    fn counts_commits_per_exact_author_name() {
        let metrics = vec![by("Ann", "1"), by("ann", "2"), by("Ann", "3")];
        assert_eq!(
            summarize(&metrics),
            vec![
                AuthorCommitCount { author: "Ann".to_string(), commit_count: 2 },
                AuthorCommitCount { author: "ann".to_string(), commit_count: 1 },
            ]
        );
    }

    #[test]
    fn writes_summary_next_to_other_summaries() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = write_artifact(&dir.path().join("metrics"), "demo", &[by("Ann", "1")]).unwrap();
        let out = dir.path().join("summaries");

        let path = write_summary(&artifact, &out).unwrap();
        assert_eq!(path, out.join("demo_summary.json"));
        let v: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(v, serde_json::json!([{"author": "Ann", "commitCount": 1}]));
    }
}
