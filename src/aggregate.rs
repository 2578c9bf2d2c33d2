//! Read-only views computed from a store snapshot. Every call recomputes from
//! the records it is given.

use crate::model::{
    AuthorFiles, AuthorTotals, Contributor, DailyBucket, HourlyBucket, StoredCommit, WorkPatterns,
};
use crate::util::day_key;
use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use indexmap::IndexMap;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_TOP_N: usize = 5;

/// Per-author totals keyed by author name in first-seen order. The first
/// email seen for a name is kept.
pub fn author_totals(commits: &[StoredCommit]) -> IndexMap<String, AuthorTotals> {
    let mut map: IndexMap<String, AuthorTotals> = IndexMap::new();

    for commit in commits {
        let m = &commit.metric;
        let entry = map.entry(m.author.name.clone()).or_insert_with(|| AuthorTotals {
            email: m.author.email.clone(),
            total_commits: 0,
            total_insertions: 0,
            total_deletions: 0,
        });
        entry.total_commits += 1;
        entry.total_insertions += m.lines.insertions;
        entry.total_deletions += m.lines.deletions;
    }

    map
}

/// Authors sorted by commit count, descending. Ties keep first-seen order.
pub fn top_contributors(commits: &[StoredCommit], n: usize) -> Vec<Contributor> {
    let mut contributors: Vec<Contributor> = author_totals(commits)
        .into_iter()
        .map(|(name, totals)| Contributor {
            name,
            email: totals.email,
            total_commits: totals.total_commits,
            insertions: totals.total_insertions,
            deletions: totals.total_deletions,
        })
        .collect();

    contributors.sort_by(|a, b| b.total_commits.cmp(&a.total_commits));
    contributors.truncate(n);
    contributors
}

pub fn daily_histogram(commits: &[StoredCommit]) -> Vec<DailyBucket> {
    let mut days: BTreeMap<String, u64> = BTreeMap::new();
    for commit in commits {
        *days.entry(day_key(&commit.metric.date)).or_insert(0) += 1;
    }
    days.into_iter()
        .map(|(day, count)| DailyBucket { day, count })
        .collect()
}

/// All 24 hours, using the hour in each commit's recorded offset.
pub fn hourly_histogram(commits: &[StoredCommit]) -> Vec<HourlyBucket> {
    let mut hours = [0u64; 24];
    for commit in commits {
        hours[commit.metric.date.hour() as usize] += 1;
    }
    hours
        .iter()
        .enumerate()
        .map(|(hour, &commits)| HourlyBucket {
            hour: format!("{hour}:00"),
            commits,
        })
        .collect()
}

pub fn files_by_author(commits: &[StoredCommit]) -> Vec<AuthorFiles> {
    let mut map: IndexMap<String, BTreeSet<String>> = IndexMap::new();
    for commit in commits {
        map.entry(commit.metric.author.name.clone())
            .or_default()
            .extend(commit.metric.files.iter().cloned());
    }
    map.into_iter()
        .map(|(author, files)| AuthorFiles {
            author,
            files: files.into_iter().collect(),
        })
        .collect()
}

/// 22:00 through 06:59 local time.
pub fn is_late_night(date: &DateTime<FixedOffset>) -> bool {
    let hour = date.hour();
    hour >= 22 || hour <= 6
}

pub fn is_weekend(date: &DateTime<FixedOffset>) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Adds one commit at `date` to the matching work-pattern bucket.
pub fn tally_pattern(patterns: &mut WorkPatterns, date: &DateTime<FixedOffset>) {
    match (is_late_night(date), is_weekend(date)) {
        (true, true) => patterns.late_night_weekend += 1,
        (true, false) => patterns.late_night += 1,
        (false, true) => patterns.weekend += 1,
        (false, false) => patterns.regular += 1,
    }
}

/// Buckets commits by local time of day and weekday.
pub fn work_patterns(commits: &[StoredCommit]) -> WorkPatterns {
    let mut patterns = WorkPatterns::default();
    for commit in commits {
        tally_pattern(&mut patterns, &commit.metric.date);
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Author, CommitMetric, LineStats};
    use pretty_assertions::assert_eq;

    fn commit(id: i64, author: &str, date: &str, files: &[&str], ins: u64, del: u64) -> StoredCommit {
        StoredCommit {
            id,
            metric: CommitMetric {
                repository: "demo".to_string(),
                commit_id: format!("c{id}"),
                parent_commits: vec![],
                author: Author {
                    name: author.to_string(),
                    email: format!("{id}@{author}.dev"),
                },
                date: DateTime::parse_from_rfc3339(date).unwrap(),
                files: files.iter().map(|f| f.to_string()).collect(),
                lines: LineStats {
                    insertions: ins,
                    deletions: del,
                },
            },
        }
    }

    fn counted(counts: &[(&str, usize)]) -> Vec<StoredCommit> {
        let mut id = 0;
        let mut out = Vec::new();
        for (author, n) in counts {
            for _ in 0..*n {
                id += 1;
                out.push(commit(id, author, "2024-01-01T12:00:00Z", &[], 1, 0));
            }
        }
        out
    }

    #[test]
    fn author_totals_sum_lines_and_keep_first_email() {
        let commits = vec![
            commit(1, "A", "2024-01-01T09:00:00Z", &["x"], 10, 2),
            commit(2, "B", "2024-01-01T09:00:00Z", &["y"], 1, 1),
            commit(3, "A", "2024-01-02T09:00:00Z", &["z"], 5, 0),
        ];
        let totals = author_totals(&commits);
        assert_eq!(totals.keys().cloned().collect::<Vec<_>>(), vec!["A", "B"]);
        let a = &totals["A"];
        assert_eq!(a.email, "1@A.dev");
        assert_eq!(a.total_commits, 2);
        assert_eq!(a.total_insertions, 15);
        assert_eq!(a.total_deletions, 2);
    }

    #[test]
    fn top_two_breaks_ties_by_first_encounter() {
        let commits = counted(&[("B", 3), ("A", 5), ("C", 3)]);
        let top = top_contributors(&commits, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "A");
        assert_eq!(top[0].total_commits, 5);
        assert_eq!(top[1].name, "B");
    }

    #[test]
    fn top_n_larger_than_author_count_returns_everyone() {
        let commits = counted(&[("A", 1), ("B", 2)]);
        assert_eq!(top_contributors(&commits, DEFAULT_TOP_N).len(), 2);
    }

    #[test]
    fn hourly_histogram_fills_all_hours() {
        let commits = vec![
            commit(1, "A", "2024-01-01T00:05:00Z", &[], 0, 0),
            commit(2, "A", "2024-01-02T00:59:00Z", &[], 0, 0),
            commit(3, "B", "2024-01-02T13:00:00Z", &[], 0, 0),
        ];
        let hours = hourly_histogram(&commits);
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0], HourlyBucket { hour: "0:00".to_string(), commits: 2 });
        assert_eq!(hours[13].commits, 1);
        let rest: u64 = hours
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 0 && *i != 13)
            .map(|(_, b)| b.commits)
            .sum();
        assert_eq!(rest, 0);
    }

    #[test]
    fn hourly_histogram_uses_recorded_offset() {
        let commits = vec![commit(1, "A", "2024-01-01T23:30:00+05:00", &[], 0, 0)];
        assert_eq!(hourly_histogram(&commits)[23].commits, 1);
    }

    #[test]
    fn daily_histogram_collapses_same_day() {
        let commits = vec![
            commit(1, "A", "2024-01-02T10:00:00Z", &[], 0, 0),
            commit(2, "A", "2024-01-01T09:00:00Z", &[], 0, 0),
            commit(3, "B", "2024-01-01T22:00:00Z", &[], 0, 0),
        ];
        assert_eq!(
            daily_histogram(&commits),
            vec![
                DailyBucket { day: "2024-01-01".to_string(), count: 2 },
                DailyBucket { day: "2024-01-02".to_string(), count: 1 },
            ]
        );
        let v = serde_json::to_value(&daily_histogram(&commits)[0]).unwrap();
        assert_eq!(v, serde_json::json!({"_id": "2024-01-01", "count": 2}));
    }

    #[test]
    fn files_by_author_unions_without_duplicates() {
        let commits = vec![
            commit(1, "A", "2024-01-01T09:00:00Z", &["a.rs", "b.rs"], 0, 0),
            commit(2, "B", "2024-01-01T09:00:00Z", &["c.rs"], 0, 0),
            commit(3, "A", "2024-01-01T09:00:00Z", &["b.rs", "d.rs"], 0, 0),
        ];
        let files = files_by_author(&commits);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].author, "A");
        assert_eq!(files[0].files, vec!["a.rs", "b.rs", "d.rs"]);
        assert_eq!(files[1].files, vec!["c.rs"]);
    }

    #[test]
    fn work_patterns_classify_local_time() {
        let commits = vec![
            // Monday
            commit(1, "A", "2024-01-01T10:00:00Z", &[], 0, 0),
            commit(2, "A", "2024-01-01T23:00:00Z", &[], 0, 0),
            // Saturday
            commit(3, "A", "2024-01-06T12:00:00Z", &[], 0, 0),
            commit(4, "A", "2024-01-06T03:00:00+01:00", &[], 0, 0),
        ];
        assert_eq!(
            work_patterns(&commits),
            WorkPatterns {
                regular: 1,
                late_night: 1,
                weekend: 1,
                late_night_weekend: 1,
            }
        );
    }

    #[test]
    fn empty_snapshot_yields_empty_views() {
        assert!(author_totals(&[]).is_empty());
        assert!(top_contributors(&[], 3).is_empty());
        assert!(daily_histogram(&[]).is_empty());
        assert_eq!(hourly_histogram(&[]).len(), 24);
        assert!(files_by_author(&[]).is_empty());
    }
}
