use crate::error::{MetricsError, Result};
use crate::model::{Author, CommitMetric, LineStats, RawCommit};
use crate::util::parse_commit_date;
use std::collections::BTreeSet;

/// Turns one raw history record into the canonical metric for `repository`.
pub fn normalize(raw: RawCommit, repository: &str) -> Result<CommitMetric> {
    let date = parse_commit_date(&raw.date).map_err(|_| {
        MetricsError::Validation(format!("commit {} has unparseable date '{}'", raw.hash, raw.date))
    })?;

    let files: BTreeSet<String> = raw.report.files.into_iter().collect();

    let metric = CommitMetric {
        repository: repository.to_string(),
        commit_id: raw.hash,
        parent_commits: raw.parents,
        author: Author {
            name: raw.author_name,
            email: raw.author_email,
        },
        date,
        files,
        lines: LineStats {
            insertions: raw.report.insertions,
            deletions: raw.report.deletions,
        },
    };
    metric.validate()?;
    Ok(metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChangeReport;
    use chrono::{TimeZone, Utc};

    fn raw(date: &str, files: &[&str]) -> RawCommit {
        RawCommit {
            hash: "deadbeef".to_string(),
            parents: vec!["cafe".to_string()],
            author_name: "Grace".to_string(),
            author_email: "grace@example.com".to_string(),
            date: date.to_string(),
            report: ChangeReport {
                files: files.iter().map(|f| f.to_string()).collect(),
                insertions: 12,
                deletions: 4,
            },
        }
    }

    #[test]
    fn builds_metric_with_repository_tag_and_deduplicated_files() {
        let m = normalize(raw("2024-05-01T10:00:00+02:00", &["b.rs", "a.rs", "b.rs"]), "demo").unwrap();
        assert_eq!(m.repository, "demo");
        assert_eq!(m.commit_id, "deadbeef");
        assert_eq!(m.files.iter().cloned().collect::<Vec<_>>(), vec!["a.rs", "b.rs"]);
        assert_eq!(m.lines.insertions, 12);
        assert_eq!(m.lines.deletions, 4);
        assert_eq!(m.date_utc(), Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());
    }

    #[test]
    fn unparseable_date_is_a_validation_error() {
        let err = normalize(raw("not a date", &[]), "demo").unwrap_err();
        assert!(matches!(err, MetricsError::Validation(msg) if msg.contains("deadbeef")));
    }

    #[test]
    fn empty_repository_tag_is_rejected() {
        assert!(normalize(raw("2024-05-01T10:00:00Z", &[]), "").is_err());
    }
}
