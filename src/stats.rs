use crate::aggregate::{hourly_histogram, top_contributors};
use crate::config::Config;
use crate::model::{Contributor, HourlyBucket};
use crate::store::MetricsStore;
use anyhow::Context;
use console::style;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    total_commits: u64,
    top_contributors: Vec<Contributor>,
    hourly: Vec<HourlyBucket>,
}

pub fn exec(config: &Config, top: usize, repository: Option<String>, json: bool) -> anyhow::Result<()> {
    let store = MetricsStore::open(&config.database).context("Failed to open metrics store")?;
    let commits = match repository.as_deref() {
        Some(r) => store.by_repository(r)?,
        None => store.all()?,
    };

    let output = StatsOutput {
        total_commits: commits.len() as u64,
        top_contributors: top_contributors(&commits, top),
        hourly: hourly_histogram(&commits),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output_table(&output);
    }
    Ok(())
}

fn bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let filled = ((value as f64 / max as f64) * width as f64).round() as usize;
    "█".repeat(filled)
}

fn output_table(output: &StatsOutput) {
    if output.total_commits == 0 {
        println!("No commits stored");
        return;
    }

    println!("{}", style("Top Contributors").bold());
    println!("{}", "─".repeat(72));
    println!(
        "{:<30} {:>8} {:>10} {:>10}",
        style("Author").bold(),
        style("Commits").bold(),
        style("Added").bold(),
        style("Deleted").bold()
    );
    for c in &output.top_contributors {
        println!(
            "{:<30} {:>8} {:>10} {:>10}",
            c.name,
            c.total_commits,
            style(c.insertions).green(),
            style(c.deletions).red()
        );
    }

    let max = output.hourly.iter().map(|h| h.commits).max().unwrap_or(0);
    println!("\n{}", style("Commits by Hour").bold());
    println!("{}", "─".repeat(72));
    for h in &output.hourly {
        println!("{:>6} {:>5} {}", h.hour, h.commits, style(bar(h.commits, max, 50)).cyan());
    }
}
