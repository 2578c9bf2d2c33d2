use crate::config::Config;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "commitlens")]
#[command(about = "Extract commit metrics from git repositories, store them, and serve analytics")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Clone, Default)]
pub struct CommonArgs {
    #[arg(long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Path to metrics database")]
    pub db: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory holding cloned repositories")]
    pub repos_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory for JSON metric artifacts")]
    pub metrics_dir: Option<PathBuf>,

    #[arg(long, global = true, help = "Directory for per-repository author summaries")]
    pub summaries_dir: Option<PathBuf>,
}

impl CommonArgs {
    /// Config file and environment, with command line flags on top.
    pub fn resolve(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_to(&mut config);
        Ok(config)
    }

    pub fn apply_to(&self, config: &mut Config) {
        if let Some(db) = &self.db {
            config.database = db.clone();
        }
        if let Some(dir) = &self.repos_dir {
            config.repos_dir = dir.clone();
        }
        if let Some(dir) = &self.metrics_dir {
            config.metrics_dir = dir.clone();
        }
        if let Some(dir) = &self.summaries_dir {
            config.summaries_dir = dir.clone();
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract commit metrics from repositories into the store
    Ingest {
        #[arg(long, help = "Delete each repository's stored commits before inserting")]
        refresh: bool,

        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(help = "Repository paths (default: every directory in the repos dir)")]
        paths: Vec<PathBuf>,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, help = "Listen address, e.g. 127.0.0.1:3000")]
        bind: Option<String>,
    },
    /// Write a repository's metrics to a JSON artifact
    Export {
        #[arg(long, help = "Export every repository already in the store")]
        from_store: bool,

        #[arg(long, help = "Output directory (default: metrics dir)")]
        out: Option<PathBuf>,

        #[arg(help = "Repository path")]
        repo: Option<PathBuf>,
    },
    /// Load JSON artifacts into the store
    Load {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(help = "Artifact files (default: every .json in the metrics dir)")]
        files: Vec<PathBuf>,
    },
    /// Write per-author commit counts for every artifact
    Summary,
    /// Clone repositories listed in a manifest
    Clone {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(default_value = "repos.json", help = "Manifest of {\"url\": ...} entries")]
        manifest: PathBuf,
    },
    /// Fast-forward every cloned repository from its upstream
    Pull {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    /// Delete the cloned repositories directory
    Clean,
    /// Show top contributors and hourly activity from the store
    Stats {
        #[arg(long, default_value_t = crate::aggregate::DEFAULT_TOP_N, help = "Number of contributors")]
        top: usize,

        #[arg(long, help = "Limit to one repository")]
        repository: Option<String>,

        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        let mut config = self.common.resolve()?;
        match self.command {
            Commands::Ingest { refresh, json, paths } => crate::ingest::exec(&config, paths, refresh, json),
            Commands::Serve { bind } => {
                if let Some(bind) = bind {
                    config.bind = bind;
                }
                crate::server::exec(&config)
            }
            Commands::Export { from_store, out, repo } => {
                crate::artifact::exec_export(&config, repo, from_store, out)
            }
            Commands::Load { json, files } => crate::artifact::exec_load(&config, files, json),
            Commands::Summary => crate::summary::exec(&config),
            Commands::Clone { json, manifest } => crate::clone::exec(&config, &manifest, json),
            Commands::Pull { json } => crate::clone::exec_pull(&config, json),
            Commands::Clean => crate::clone::exec_clean(&config),
            Commands::Stats { top, repository, json } => crate::stats::exec(&config, top, repository, json),
        }
    }
}
