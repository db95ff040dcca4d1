use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod backoff;
mod cohort;
mod config;
mod export;
mod ingest;
mod models;
mod normalize;
mod priority;
mod report;
mod schedule;
mod stats;

use config::ScheduleConfig;
use schedule::Scheduler;

#[derive(Parser)]
#[command(name = "search-schedule")]
#[command(about = "Decide which recurring job searches should run today", long_about = None)]
struct Cli {
    /// TOML file with scheduling tunables
    #[arg(long, global = true, env = "SEARCH_SCHEDULE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the ranked schedule and write it as CSV
    Schedule {
        /// Directory of CSV files with past search attempts
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "schedule.csv")]
        out: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Print search efficiency statistics as markdown
    Report {
        #[arg(long)]
        input: PathBuf,
        /// Write the report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(Args, Debug, Default)]
struct Overrides {
    #[arg(long)]
    success_threshold: Option<u64>,
    #[arg(long)]
    min_backoff_minutes: Option<u64>,
    #[arg(long)]
    max_backoff_hours: Option<u64>,
    #[arg(long)]
    backoff_multiplier: Option<f64>,
    /// Comma-separated plan tiers, lowest bonus first
    #[arg(long, value_delimiter = ',')]
    priority_plans: Option<Vec<i64>>,
    /// IANA time zone for the day boundary, e.g. Europe/London
    #[arg(long)]
    timezone: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut ScheduleConfig) {
        if let Some(value) = self.success_threshold {
            config.success_threshold = value;
        }
        if let Some(value) = self.min_backoff_minutes {
            config.min_backoff_minutes = value;
        }
        if let Some(value) = self.max_backoff_hours {
            config.max_backoff_hours = value;
        }
        if let Some(value) = self.backoff_multiplier {
            config.backoff_multiplier = value;
        }
        if let Some(value) = self.priority_plans {
            config.priority_plans = value;
        }
        if let Some(value) = self.timezone {
            config.timezone = Some(value);
        }
    }
}

fn scheduler(
    config_path: Option<&std::path::Path>,
    overrides: Overrides,
) -> anyhow::Result<Scheduler> {
    let mut config = ScheduleConfig::load(config_path)?;
    overrides.apply(&mut config);
    let scheduler = Scheduler::new(config).context("invalid schedule configuration")?;
    tracing::debug!(config = ?scheduler.config(), "resolved schedule configuration");
    Ok(scheduler)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "search_schedule=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let now = chrono::Utc::now();

    match cli.command {
        Commands::Schedule {
            input,
            out,
            limit,
            overrides,
        } => {
            let scheduler = scheduler(cli.config.as_deref(), overrides)?;
            let rows = ingest::load_rows(&input).await?;
            let entries = scheduler.build(&rows, now);
            export::write_schedule(&out, &entries)?;

            let due = entries.iter().filter(|entry| entry.run_today).count();
            println!(
                "Scheduled {due} of {} cohorts to run today from {} records.",
                entries.len(),
                rows.len()
            );
            println!("Schedule written to {}.", out.display());

            if entries.is_empty() {
                return Ok(());
            }

            println!("Top cohorts by priority:");
            for entry in priority::by_priority(&entries).into_iter().take(limit) {
                println!(
                    "- {} / {} / {} ({}, plan {}) priority {:.2}, success {:.2}, run today: {}",
                    entry.key.job_title,
                    entry.key.job_location,
                    entry.key.platform,
                    entry.key.user_id,
                    entry.key.plan_tier(),
                    entry.priority,
                    entry.stats.success_rate,
                    if entry.run_today { "yes" } else { "no" }
                );
            }
        }
        Commands::Report {
            input,
            out,
            overrides,
        } => {
            let scheduler = scheduler(cli.config.as_deref(), overrides)?;
            let rows = ingest::load_rows(&input).await?;
            let entries = scheduler.build(&rows, now);
            let report = report::build_report(&entries, now);

            match out {
                Some(path) => {
                    std::fs::write(&path, report)
                        .with_context(|| format!("failed to write report to {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{report}"),
            }
        }
    }

    Ok(())
}
