use crate::error::{MetricsError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStats {
    pub insertions: u64,
    pub deletions: u64,
}

/// Canonical per-commit record held by the store and written to artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitMetric {
    #[serde(default, alias = "repo")]
    pub repository: String,
    pub commit_id: String,
    #[serde(default)]
    pub parent_commits: Vec<String>,
    pub author: Author,
    #[serde(deserialize_with = "crate::util::deserialize_commit_date")]
    pub date: DateTime<FixedOffset>,
    #[serde(default)]
    pub files: BTreeSet<String>,
    #[serde(default)]
    pub lines: LineStats,
}

impl CommitMetric {
    pub fn validate(&self) -> Result<()> {
        if self.repository.trim().is_empty() {
            return Err(MetricsError::Validation(format!(
                "commit {} has no repository tag",
                self.commit_id
            )));
        }
        if self.commit_id.trim().is_empty() {
            return Err(MetricsError::Validation("commitId must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn date_utc(&self) -> DateTime<Utc> {
        self.date.with_timezone(&Utc)
    }
}

/// A `CommitMetric` together with the identifier the store assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCommit {
    pub id: i64,
    #[serde(flatten)]
    pub metric: CommitMetric,
}

/// One line of `git log` output plus the change report fetched for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCommit {
    pub hash: String,
    pub parents: Vec<String>,
    pub author_name: String,
    pub author_email: String,
    pub date: String,
    pub report: ChangeReport,
}

/// Parsed `git show --stat` output for a single commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub files: Vec<String>,
    pub insertions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub id: i64,
    pub repository: String,
    pub commit_id: String,
    pub author: String,
    pub email: String,
    pub date: DateTime<FixedOffset>,
    pub files_changed: usize,
    pub lines: LineStats,
}

impl From<&StoredCommit> for CommitSummary {
    fn from(stored: &StoredCommit) -> Self {
        let m = &stored.metric;
        Self {
            id: stored.id,
            repository: m.repository.clone(),
            commit_id: m.commit_id.clone(),
            author: m.author.name.clone(),
            email: m.author.email.clone(),
            date: m.date,
            files_changed: m.files.len(),
            lines: m.lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorTotals {
    pub email: String,
    pub total_commits: u64,
    pub total_insertions: u64,
    pub total_deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    #[serde(rename = "_id")]
    pub name: String,
    pub email: String,
    pub total_commits: u64,
    pub insertions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    #[serde(rename = "_id")]
    pub day: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyBucket {
    pub hour: String,
    pub commits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorFiles {
    pub author: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPatterns {
    pub regular: u64,
    pub late_night: u64,
    pub weekend: u64,
    pub late_night_weekend: u64,
}

#[derive(Debug, Clone)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > &until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}
