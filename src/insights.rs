//! Team-level analytics over stored commits: per-developer efficiency and
//! work patterns, a weekday by hour heatmap, file collaboration and file
//! ownership.

use crate::aggregate::{is_late_night, is_weekend, tally_pattern};
use crate::model::{StoredCommit, WorkPatterns};
use chrono::{Datelike, Timelike};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_PATTERN_LIMIT: usize = 10;
pub const COLLABORATIVE_FILE_LIMIT: usize = 15;
pub const PAIR_LIMIT: usize = 10;
pub const MODULE_LIMIT: usize = 10;

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperStats {
    pub developer: String,
    pub total_commits: u64,
    pub insertions: u64,
    pub deletions: u64,
    pub total_changes: u64,
    pub files_changed: u64,
    pub late_night_commits: u64,
    pub weekend_commits: u64,
    pub avg_changes_per_commit: f64,
    pub avg_files_per_commit: f64,
    pub late_night_percentage: f64,
    pub weekend_percentage: f64,
    pub productivity_score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternShares {
    pub regular: f64,
    pub late_night: f64,
    pub weekend: f64,
    pub late_night_weekend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeveloperPatterns {
    pub developer: String,
    pub total: u64,
    pub counts: WorkPatterns,
    pub percentages: PatternShares,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeatmapRow {
    pub day: String,
    pub hours: Vec<u64>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollaborativeFile {
    pub file: String,
    pub contributors: usize,
    pub authors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorPair {
    pub first: String,
    pub second: String,
    pub shared_files: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collaboration {
    pub total_files: usize,
    pub collaborative_files: usize,
    pub collaborative_percentage: f64,
    pub avg_contributors_per_file: f64,
    pub unique_collaborations: usize,
    pub files: Vec<CollaborativeFile>,
    pub pairs: Vec<AuthorPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOwnership {
    pub file: String,
    pub primary_owner: String,
    pub owner_commits: u64,
    pub total_commits: u64,
    pub ownership_percentage: f64,
    pub contributors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub developer: String,
    pub files_owned: usize,
    pub owner_commits: u64,
    pub avg_ownership_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOwnership {
    pub module: String,
    pub owner: String,
    pub files: usize,
    pub owner_commits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ownership {
    pub files: Vec<FileOwnership>,
    pub owners: Vec<OwnerSummary>,
    pub modules: Vec<ModuleOwnership>,
}

/// Percentage rounded to two decimals, zero when `whole` is zero.
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 * 100.0 / whole as f64)
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Default)]
struct DeveloperAccum {
    commits: u64,
    insertions: u64,
    deletions: u64,
    files: u64,
    late_night: u64,
    weekend: u64,
}

/// Efficiency figures per developer, most commits first.
pub fn developer_stats(commits: &[StoredCommit]) -> Vec<DeveloperStats> {
    let mut by_author: IndexMap<&str, DeveloperAccum> = IndexMap::new();
    for commit in commits {
        let metric = &commit.metric;
        let entry = by_author.entry(metric.author.name.as_str()).or_default();
        entry.commits += 1;
        entry.insertions += metric.lines.insertions;
        entry.deletions += metric.lines.deletions;
        entry.files += metric.files.len() as u64;
        if is_late_night(&metric.date) {
            entry.late_night += 1;
        }
        if is_weekend(&metric.date) {
            entry.weekend += 1;
        }
    }

    let mut stats: Vec<DeveloperStats> = by_author
        .into_iter()
        .map(|(name, acc)| {
            let total_changes = acc.insertions + acc.deletions;
            DeveloperStats {
                developer: name.to_string(),
                total_commits: acc.commits,
                insertions: acc.insertions,
                deletions: acc.deletions,
                total_changes,
                files_changed: acc.files,
                late_night_commits: acc.late_night,
                weekend_commits: acc.weekend,
                avg_changes_per_commit: ratio(total_changes, acc.commits),
                avg_files_per_commit: ratio(acc.files, acc.commits),
                late_night_percentage: percent(acc.late_night, acc.commits),
                weekend_percentage: percent(acc.weekend, acc.commits),
                productivity_score: round2(
                    acc.commits as f64 * 0.3 + total_changes as f64 * 0.0001 + acc.files as f64 * 0.1,
                ),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.total_commits.cmp(&a.total_commits));
    stats
}

/// Work-pattern buckets per developer, the `limit` most active first.
pub fn developer_patterns(commits: &[StoredCommit], limit: usize) -> Vec<DeveloperPatterns> {
    let mut by_author: IndexMap<&str, WorkPatterns> = IndexMap::new();
    for commit in commits {
        let patterns = by_author.entry(commit.metric.author.name.as_str()).or_default();
        tally_pattern(patterns, &commit.metric.date);
    }

    let mut rows: Vec<DeveloperPatterns> = by_author
        .into_iter()
        .map(|(name, counts)| {
            let total = counts.regular + counts.late_night + counts.weekend + counts.late_night_weekend;
            DeveloperPatterns {
                developer: name.to_string(),
                total,
                counts,
                percentages: PatternShares {
                    regular: percent(counts.regular, total),
                    late_night: percent(counts.late_night, total),
                    weekend: percent(counts.weekend, total),
                    late_night_weekend: percent(counts.late_night_weekend, total),
                },
            }
        })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows.truncate(limit);
    rows
}

/// Seven rows, Monday to Sunday, of 24 hourly counts in each commit's
/// recorded offset.
pub fn activity_heatmap(commits: &[StoredCommit]) -> Vec<HeatmapRow> {
    let mut grid = [[0u64; 24]; 7];
    for commit in commits {
        let date = &commit.metric.date;
        grid[date.weekday().num_days_from_monday() as usize][date.hour() as usize] += 1;
    }

    WEEKDAYS
        .iter()
        .zip(grid.iter())
        .map(|(day, hours)| HeatmapRow {
            day: day.to_string(),
            hours: hours.to_vec(),
            total: hours.iter().sum(),
        })
        .collect()
}

/// Authors per file, files in path order and authors sorted by name.
fn authors_by_file(commits: &[StoredCommit]) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut map: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for commit in commits {
        for file in &commit.metric.files {
            map.entry(file.as_str())
                .or_default()
                .insert(commit.metric.author.name.as_str());
        }
    }
    map
}

/// Files touched by more than one author and the author pairs sharing them.
pub fn file_collaboration(commits: &[StoredCommit]) -> Collaboration {
    let by_file = authors_by_file(commits);
    let total_files = by_file.len();
    let total_contributors: usize = by_file.values().map(BTreeSet::len).sum();

    let mut files = Vec::new();
    let mut pair_counts: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for (file, authors) in &by_file {
        if authors.len() < 2 {
            continue;
        }
        let names: Vec<&str> = authors.iter().copied().collect();
        for (i, first) in names.iter().enumerate() {
            for second in &names[i + 1..] {
                *pair_counts.entry((*first, *second)).or_insert(0) += 1;
            }
        }
        files.push(CollaborativeFile {
            file: file.to_string(),
            contributors: names.len(),
            authors: names.iter().map(|a| a.to_string()).collect(),
        });
    }

    let collaborative_files = files.len();
    files.sort_by(|a, b| b.contributors.cmp(&a.contributors));
    files.truncate(COLLABORATIVE_FILE_LIMIT);

    let unique_collaborations = pair_counts.len();
    let mut pairs: Vec<AuthorPair> = pair_counts
        .into_iter()
        .map(|((first, second), shared_files)| AuthorPair {
            first: first.to_string(),
            second: second.to_string(),
            shared_files,
        })
        .collect();
    pairs.sort_by(|a, b| b.shared_files.cmp(&a.shared_files));
    pairs.truncate(PAIR_LIMIT);

    Collaboration {
        total_files,
        collaborative_files,
        collaborative_percentage: percent(collaborative_files as u64, total_files as u64),
        avg_contributors_per_file: ratio(total_contributors as u64, total_files as u64),
        unique_collaborations,
        files,
        pairs,
    }
}

/// Parent directory of a path, `root` for top-level files.
fn module_of(file: &str) -> &str {
    file.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("root")
}

/// Primary owner per file (most commits, earliest author on ties), a
/// per-owner summary and owner commits for the most active modules.
pub fn file_ownership(commits: &[StoredCommit]) -> Ownership {
    let mut per_file: BTreeMap<&str, IndexMap<&str, u64>> = BTreeMap::new();
    for commit in commits {
        for file in &commit.metric.files {
            *per_file
                .entry(file.as_str())
                .or_default()
                .entry(commit.metric.author.name.as_str())
                .or_insert(0) += 1;
        }
    }

    let mut files: Vec<FileOwnership> = Vec::with_capacity(per_file.len());
    for (file, authors) in &per_file {
        let total_commits: u64 = authors.values().sum();
        let mut owner: Option<(&str, u64)> = None;
        for (author, count) in authors {
            if owner.map_or(true, |(_, best)| *count > best) {
                owner = Some((*author, *count));
            }
        }
        let Some((primary_owner, owner_commits)) = owner else {
            continue;
        };
        files.push(FileOwnership {
            file: file.to_string(),
            primary_owner: primary_owner.to_string(),
            owner_commits,
            total_commits,
            ownership_percentage: percent(owner_commits, total_commits),
            contributors: authors.len(),
        });
    }
    files.sort_by(|a, b| b.total_commits.cmp(&a.total_commits));

    #[derive(Default)]
    struct OwnerAccum {
        files: usize,
        commits: u64,
        percentage_sum: f64,
    }
    let mut owners_acc: BTreeMap<&str, OwnerAccum> = BTreeMap::new();
    let mut modules_acc: BTreeMap<(&str, &str), (usize, u64)> = BTreeMap::new();
    let mut module_totals: BTreeMap<&str, u64> = BTreeMap::new();
    for row in &files {
        let acc = owners_acc.entry(row.primary_owner.as_str()).or_default();
        acc.files += 1;
        acc.commits += row.owner_commits;
        acc.percentage_sum += row.ownership_percentage;

        let module = module_of(&row.file);
        let slot = modules_acc.entry((module, row.primary_owner.as_str())).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += row.owner_commits;
        *module_totals.entry(module).or_insert(0) += row.owner_commits;
    }

    let mut owners: Vec<OwnerSummary> = owners_acc
        .into_iter()
        .map(|(developer, acc)| OwnerSummary {
            developer: developer.to_string(),
            files_owned: acc.files,
            owner_commits: acc.commits,
            avg_ownership_percentage: round2(acc.percentage_sum / acc.files as f64),
        })
        .collect();
    owners.sort_by(|a, b| b.files_owned.cmp(&a.files_owned));

    let mut ranked: Vec<(&str, u64)> = module_totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    let top: BTreeSet<&str> = ranked.iter().take(MODULE_LIMIT).map(|(m, _)| *m).collect();
    let modules = modules_acc
        .into_iter()
        .filter(|((module, _), _)| top.contains(module))
        .map(|((module, owner), (files, owner_commits))| ModuleOwnership {
            module: module.to_string(),
            owner: owner.to_string(),
            files,
            owner_commits,
        })
        .collect();

    Ownership { files, owners, modules }
}
