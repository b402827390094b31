//! # AzNews Scraper
//!
//! Scrapes eleven Azerbaijani news sites and keeps the latest snapshot of
//! each source's articles in SQLite, alongside per-run job and error
//! telemetry with bounded retention.
//!
//! ## Usage
//!
//! ```sh
//! aznews_scraper run-all --pages 3 --trigger scheduled
//! aznews_scraper run trend.az --details
//! aznews_scraper stats
//! ```
//!
//! ## Architecture
//!
//! 1. **Coordinator**: picks the sources and runs them sequentially or with a
//!    bounded worker pool
//! 2. **Runner**: per source, opens a job, clears the old snapshot and walks
//!    the listing pages
//! 3. **Fetcher / Extractors**: download markup (static or rendered) and parse
//!    it into article records
//! 4. **Database**: stores articles, jobs and errors, and purges old history
//!
//! The process exits non-zero when any source run ends `failed`.

use clap::Parser;
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod coordinator;
mod dates;
mod db;
mod error;
mod fetcher;
mod models;
mod outputs;
mod runner;
mod scrapers;
mod utils;

use cli::{Cli, Command, RunArgs};
use config::Config;
use coordinator::Coordinator;
use db::Database;
use fetcher::DefaultFetcherFactory;
use outputs::json;
use runner::RunOptions;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    let mut config = Config::load(args.config.as_deref()).await?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }
    if let Some(mode) = args.render {
        config.render_mode = mode;
    }

    let db = Database::connect(&config.database_url, config.max_db_connections).await?;

    let code = match args.command {
        Command::Run { domain, args } => scrape(&db, config, Some(domain), args).await?,
        Command::RunAll { args } => scrape(&db, config, None, args).await?,
        Command::List => {
            list_sources(&db).await?;
            ExitCode::SUCCESS
        }
        Command::Stats => {
            show_stats(&db).await?;
            ExitCode::SUCCESS
        }
        Command::Articles { domain, limit } => {
            show_articles(&db, &domain, limit).await?;
            ExitCode::SUCCESS
        }
        Command::Jobs { domain, limit } => {
            show_jobs(&db, &domain, limit).await?;
            ExitCode::SUCCESS
        }
        Command::Errors { job_id } => show_errors(&db, job_id).await?,
        Command::Enable { domain } => {
            db.set_source_active(&domain, true).await?;
            info!(source = %domain, "Source enabled");
            ExitCode::SUCCESS
        }
        Command::Disable { domain } => {
            db.set_source_active(&domain, false).await?;
            info!(source = %domain, "Source disabled");
            ExitCode::SUCCESS
        }
    };

    db.close().await;
    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(code)
}

/// Run one source (`domain`) or all active sources and report the outcome.
#[instrument(
    level = "info",
    skip_all,
    fields(domain = ?domain, pages = args.pages, details = args.details)
)]
async fn scrape(
    db: &Database,
    mut config: Config,
    domain: Option<String>,
    args: RunArgs,
) -> Result<ExitCode, Box<dyn Error>> {
    // Early check: a report that cannot be written should fail before scraping
    if let Some(dir) = &args.report_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "Report directory is not writable");
            return Err(e);
        }
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling active runs");
            let _ = cancel_tx.send(true);
        }
    });

    let options = RunOptions {
        max_pages: args.pages,
        scrape_details: args.details,
        trigger: args.trigger,
        deadline: args
            .timeout_secs
            .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs)),
    };
    let factory = DefaultFetcherFactory;
    let coordinator = Coordinator::new(db, &config, &factory, options, cancel_rx);

    let report = match domain {
        Some(domain) => coordinator.run_domain(&domain).await?,
        None => coordinator.run_all().await?,
    };
    report.log_summary();

    if let Some(dir) = &args.report_dir {
        if let Err(e) = json::write_run_report(&report, dir).await {
            error!(error = %e, "Failed to write run report");
        }
    }

    Ok(if report.any_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn list_sources(db: &Database) -> Result<(), Box<dyn Error>> {
    println!(
        "{:<16} {:<12} {:<16} {:<7} BASE URL",
        "DOMAIN", "NAME", "PAGINATION", "ACTIVE"
    );
    for source in db.list_sources().await? {
        println!(
            "{:<16} {:<12} {:<16} {:<7} {}",
            source.domain,
            source.name,
            source.pagination,
            if source.is_active { "yes" } else { "no" },
            source.base_url
        );
    }
    Ok(())
}

async fn show_stats(db: &Database) -> Result<(), Box<dyn Error>> {
    println!(
        "{:<16} {:>8} {:<22} {:>6} {:>9} {:>7} {:>6} {:>9}",
        "SOURCE",
        "ARTICLES",
        "LAST SCRAPE (UTC)",
        "JOBS",
        "COMPLETED",
        "PARTIAL",
        "FAILED",
        "AVG SECS"
    );
    for s in db.stats().await? {
        println!(
            "{:<16} {:>8} {:<22} {:>6} {:>9} {:>7} {:>6} {:>9}",
            s.domain,
            s.article_count,
            s.last_scraped_at
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            s.jobs_total,
            s.jobs_completed,
            s.jobs_partial,
            s.jobs_failed,
            s.avg_duration_secs
                .map(|secs| format!("{secs:.1}"))
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}

async fn source_id(db: &Database, domain: &str) -> Result<i64, Box<dyn Error>> {
    let source = db
        .get_source(domain)
        .await?
        .ok_or_else(|| error::StoreError::SourceNotFound(domain.to_string()))?;
    Ok(source.id)
}

async fn show_articles(db: &Database, domain: &str, limit: u32) -> Result<(), Box<dyn Error>> {
    let source_id = source_id(db, domain).await?;
    for article in db.recent_articles(source_id, limit).await? {
        let published = article
            .published_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{published:<16}  {}", article.title);
        println!("{:<16}  {}", "", article.url);
        if let Some(excerpt) = &article.excerpt {
            println!("{:<16}  {}", "", utils::truncate_for_log(excerpt, 120));
        }
    }
    Ok(())
}

async fn show_jobs(db: &Database, domain: &str, limit: u32) -> Result<(), Box<dyn Error>> {
    let source_id = source_id(db, domain).await?;
    println!(
        "{:>6} {:<14} {:<10} {:<20} {:>6} {:>6} {:>6} {:>6}  ERROR",
        "JOB", "KIND", "STATUS", "STARTED (UTC)", "PAGES", "FOUND", "NEW", "FAILED"
    );
    for job in db.jobs_for_source(source_id, limit).await? {
        println!(
            "{:>6} {:<14} {:<10} {:<20} {:>6} {:>6} {:>6} {:>6}  {}",
            job.id,
            job.kind.as_str(),
            job.status,
            job.started_at.format("%Y-%m-%d %H:%M:%S"),
            job.counters.pages_scraped,
            job.counters.articles_found,
            job.counters.articles_new,
            job.counters.articles_failed,
            job.error_message.as_deref().unwrap_or(""),
        );
    }
    Ok(())
}

async fn show_errors(db: &Database, job_id: i64) -> Result<ExitCode, Box<dyn Error>> {
    let Some(job) = db.get_job(job_id).await? else {
        error!(job_id, "No such job");
        return Ok(ExitCode::FAILURE);
    };
    println!(
        "job {} ({}, {}, triggered by {})",
        job.id,
        job.kind.as_str(),
        job.status,
        job.triggered_by
    );
    for e in db.errors_for_job(job_id).await? {
        println!(
            "{}  {:<20} retries={} {}\n    {}",
            e.created_at.format("%Y-%m-%d %H:%M:%S"),
            e.error_type,
            e.retry_count,
            e.url,
            e.message
        );
    }
    Ok(ExitCode::SUCCESS)
}
