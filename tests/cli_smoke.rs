use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    // init and basic identity
    git(dir, &["init"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "core.safecrlf", "false"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
}

fn commit_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", &format!("add {name}")]);
    git(dir, &["reset", "--hard"]);
}

fn commitlens(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("commitlens").unwrap();
    cmd.env_remove("COMMITLENS_DB")
        .env_remove("COMMITLENS_REPOS_DIR")
        .env_remove("COMMITLENS_METRICS_DIR")
        .env_remove("COMMITLENS_SUMMARIES_DIR")
        .arg("--db")
        .arg(db);
    cmd
}

fn run_json(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn stored_total(db: &Path) -> u64 {
    let v = run_json(commitlens(db).args(["stats", "--json"]));
    v["totalCommits"].as_u64().unwrap()
}

#[test]
fn ingest_json_reports_written_commits() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("alpha");
    init_git_repo(&repo);
    commit_file(&repo, "src/a.rs", "fn a(){}\n");
    commit_file(&repo, "src/b.rs", "fn b(){}\nfn c(){}\n");

    let db = dir.path().join("metrics.db");
    let v = run_json(commitlens(&db).arg("ingest").arg("--json").arg(&repo));

    let repos = v["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["repository"], "alpha");
    assert_eq!(repos[0]["written"], 2);
    assert!(repos[0].get("error").is_none());
    assert_eq!(stored_total(&db), 2);
}

#[test]
fn reingest_does_not_duplicate() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("alpha");
    init_git_repo(&repo);
    commit_file(&repo, "lib.rs", "pub fn hi(){}\n");
    commit_file(&repo, "lib.rs", "pub fn hi(){ println!(\"hi\"); }\n");

    let db = dir.path().join("metrics.db");
    commitlens(&db).arg("ingest").arg("--json").arg(&repo).assert().success();
    commitlens(&db).arg("ingest").arg("--json").arg(&repo).assert().success();
    assert_eq!(stored_total(&db), 2);

    commitlens(&db)
        .arg("ingest")
        .args(["--json", "--refresh"])
        .arg(&repo)
        .assert()
        .success();
    assert_eq!(stored_total(&db), 2);
}

#[test]
fn merge_commits_are_not_ingested() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("merged");
    init_git_repo(&repo);

    // create base
    commit_file(&repo, "file.txt", "a\n");

    // create feature branch and diverge on a different file
    git(&repo, &["checkout", "-b", "feat"]);
    commit_file(&repo, "feat.txt", "f1\n");

    // return to the base branch and diverge on original file
    git(&repo, &["checkout", "-"]);
    commit_file(&repo, "file.txt", "a\nc\n");

    // merge feature (creates a merge commit without conflicts)
    git(&repo, &["merge", "--no-ff", "feat", "-m", "merge feat"]);

    let db = dir.path().join("metrics.db");
    let v = run_json(commitlens(&db).arg("ingest").arg("--json").arg(&repo));
    assert_eq!(v["repositories"][0]["written"], 3);
    assert_eq!(stored_total(&db), 3);
}

#[test]
fn failing_repository_does_not_abort_the_batch() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let good = dir.path().join("good");
    init_git_repo(&good);
    commit_file(&good, "a.txt", "a\n");
    let missing = dir.path().join("missing");

    let db = dir.path().join("metrics.db");
    let v = run_json(
        commitlens(&db)
            .arg("ingest")
            .arg("--json")
            .arg(&missing)
            .arg(&good),
    );

    let repos = v["repositories"].as_array().unwrap();
    assert_eq!(repos.len(), 2);
    assert!(repos[0]["error"].is_string());
    assert_eq!(repos[1]["repository"], "good");
    assert_eq!(repos[1]["written"], 1);
    assert_eq!(stored_total(&db), 1);
}

#[test]
fn export_then_load_round_trips_through_artifacts() {
    if !has_git() {
        return;
    }
    let dir = tempdir().unwrap();
    let repo = dir.path().join("alpha");
    init_git_repo(&repo);
    commit_file(&repo, "a.txt", "one\n");
    commit_file(&repo, "b.txt", "two\n");
    let metrics_dir = dir.path().join("metrics");

    let db = dir.path().join("metrics.db");
    commitlens(&db)
        .arg("export")
        .arg("--out")
        .arg(&metrics_dir)
        .arg(&repo)
        .assert()
        .success();

    let artifact = metrics_dir.join("alpha.json");
    let records: Vec<serde_json::Value> = serde_json::from_str(&fs::read_to_string(&artifact).unwrap()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["repository"], "alpha");
    assert!(records[0]["lines"]["insertions"].as_u64().unwrap() >= 1);

    let v = run_json(commitlens(&db).arg("load").arg("--json").arg(&artifact));
    assert_eq!(v["repositories"][0]["written"], 2);
    assert_eq!(stored_total(&db), 2);

    // loading the same artifact again upserts
    commitlens(&db).arg("load").arg("--json").arg(&artifact).assert().success();
    assert_eq!(stored_total(&db), 2);
}

#[test]
fn stats_on_empty_store_has_24_hour_buckets() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("metrics.db");
    let v = run_json(commitlens(&db).args(["stats", "--json"]));
    assert_eq!(v["totalCommits"], 0);
    assert_eq!(v["hourly"].as_array().unwrap().len(), 24);
    assert!(v["topContributors"].as_array().unwrap().is_empty());
}
