//! Command-line interface definitions for the scraper.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Connection and rendering settings can also come from environment variables,
//! and override the configuration file.

use crate::fetcher::FetchMode;
use crate::models::Trigger;
use crate::scrapers::{find, registry};
use clap::{Args, Parser, Subcommand};
use itertools::Itertools;
use std::path::PathBuf;

/// Command-line arguments for the scraper.
///
/// # Examples
///
/// ```sh
/// # Scheduled run of every active source
/// aznews_scraper run-all --trigger scheduled --report-dir ./reports
///
/// # One source, five pages, with article bodies
/// aznews_scraper run oxu.az --pages 5 --details
///
/// # Force the headless browser for this invocation
/// RENDER_MODE=rendered aznews_scraper run axar.az
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite connection string, e.g. `sqlite://aznews.db`
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Fetch mode for every source (per-source overrides still apply)
    #[arg(long, env = "RENDER_MODE", value_enum, global = true)]
    pub render: Option<FetchMode>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape a single source
    Run {
        /// Source domain, e.g. `oxu.az`
        #[arg(value_parser = known_domain)]
        domain: String,

        #[command(flatten)]
        args: RunArgs,
    },
    /// Scrape every active source
    RunAll {
        #[command(flatten)]
        args: RunArgs,
    },
    /// List registered sources
    List,
    /// Show article and job statistics per source
    Stats,
    /// Show the stored articles of a source
    Articles {
        #[arg(value_parser = known_domain)]
        domain: String,

        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
    /// Show recent scrape jobs of a source
    Jobs {
        #[arg(value_parser = known_domain)]
        domain: String,

        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
    /// Show the errors recorded for one job
    Errors { job_id: i64 },
    /// Include a source in `run-all` again
    Enable {
        #[arg(value_parser = known_domain)]
        domain: String,
    },
    /// Leave a source out of `run-all`
    Disable {
        #[arg(value_parser = known_domain)]
        domain: String,
    },
}

/// Options shared by `run` and `run-all`.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Maximum number of listing pages per source
    #[arg(short, long, default_value_t = 3)]
    pub pages: u32,

    /// Fetch each article page for its full text (slower)
    #[arg(short, long)]
    pub details: bool,

    /// What started this run
    #[arg(long, value_enum, default_value_t = Trigger::Manual)]
    pub trigger: Trigger,

    /// Sources scraped at the same time (overrides the config file)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Stop all runs after this many seconds and mark them failed
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Directory to write the JSON run report into
    #[arg(long)]
    pub report_dir: Option<String>,
}

fn known_domain(domain: &str) -> Result<String, String> {
    match find(domain) {
        Some(extractor) => Ok(extractor.domain().to_string()),
        None => Err(format!(
            "unknown source '{domain}' (available: {})",
            registry().iter().map(|e| e.domain()).join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["aznews_scraper", "run", "oxu.az"]);
        match cli.command {
            Command::Run { domain, args } => {
                assert_eq!(domain, "oxu.az");
                assert_eq!(args.pages, 3);
                assert!(!args.details);
                assert_eq!(args.trigger, Trigger::Manual);
                assert!(args.workers.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_all_flags() {
        let cli = Cli::parse_from([
            "aznews_scraper",
            "run-all",
            "-p",
            "10",
            "-d",
            "--trigger",
            "ci",
            "--workers",
            "3",
            "--timeout-secs",
            "1200",
            "--report-dir",
            "/tmp/reports",
            "--render",
            "rendered",
        ]);
        assert_eq!(cli.render, Some(FetchMode::Rendered));
        match cli.command {
            Command::RunAll { args } => {
                assert_eq!(args.pages, 10);
                assert!(args.details);
                assert_eq!(args.trigger, Trigger::Ci);
                assert_eq!(args.workers, Some(3));
                assert_eq!(args.timeout_secs, Some(1200));
                assert_eq!(args.report_dir.as_deref(), Some("/tmp/reports"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_unknown_domain_is_usage_error() {
        let err = Cli::try_parse_from(["aznews_scraper", "run", "metbuat.az"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("sonxeber.az"));
    }

    #[test]
    fn test_inspection_commands() {
        let cli = Cli::parse_from(["aznews_scraper", "jobs", "apa.az", "-l", "3"]);
        assert!(
            matches!(cli.command, Command::Jobs { ref domain, limit: 3 } if domain == "apa.az")
        );

        let cli = Cli::parse_from(["aznews_scraper", "errors", "42"]);
        assert!(matches!(cli.command, Command::Errors { job_id: 42 }));
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["aznews_scraper", "stats", "--config", "/etc/aznews.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/aznews.yaml")));
        assert!(matches!(cli.command, Command::Stats));
    }
}
