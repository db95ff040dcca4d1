use std::path::Path;

use anyhow::Context;
use chrono::SecondsFormat;
use serde::Serialize;

use crate::models::{AttemptRecord, ScheduleEntry};

pub const HEADER: [&str; 13] = [
    "userId",
    "jobTitle",
    "jobLocation",
    "jobType",
    "remote",
    "platform",
    "pricingPlan",
    "runToday",
    "successRate",
    "totalSearches",
    "totalJobsFound",
    "priority",
    "recentSearches",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRow<'a> {
    user_id: &'a str,
    job_title: &'a str,
    job_location: &'a str,
    job_type: &'a str,
    remote: &'a str,
    platform: &'a str,
    pricing_plan: i64,
    run_today: &'static str,
    success_rate: String,
    total_searches: usize,
    total_jobs_found: u64,
    priority: f64,
    recent_searches: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecentSearch {
    timestamp: Option<String>,
    total_jobs: u64,
    new_jobs: u64,
    time_taken: f64,
}

impl From<&AttemptRecord> for RecentSearch {
    fn from(record: &AttemptRecord) -> Self {
        Self {
            timestamp: record
                .timestamp
                .map(|ts| ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            total_jobs: record.total_jobs_found,
            new_jobs: record.new_jobs_found,
            time_taken: record.duration_seconds,
        }
    }
}

fn to_row(entry: &ScheduleEntry) -> anyhow::Result<ScheduleRow<'_>> {
    let recent: Vec<RecentSearch> = entry
        .stats
        .recent_searches
        .iter()
        .map(RecentSearch::from)
        .collect();

    Ok(ScheduleRow {
        user_id: &entry.key.user_id,
        job_title: &entry.key.job_title,
        job_location: &entry.key.job_location,
        job_type: &entry.key.job_type,
        remote: &entry.key.remote,
        platform: &entry.key.platform,
        pricing_plan: entry.key.plan_tier(),
        run_today: if entry.run_today { "Yes" } else { "No" },
        success_rate: format!("{:.2}", entry.stats.success_rate),
        total_searches: entry.stats.total_searches,
        total_jobs_found: entry.stats.total_jobs_found,
        priority: entry.priority,
        recent_searches: serde_json::to_string(&recent)?,
    })
}

pub fn write_schedule_to<W: std::io::Write>(
    writer: W,
    entries: &[ScheduleEntry],
) -> anyhow::Result<()> {
    // Header is written by hand so an empty schedule still has one.
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(HEADER)?;
    for entry in entries {
        csv.serialize(to_row(entry)?)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn write_schedule(path: &Path, entries: &[ScheduleEntry]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_schedule_to(file, entries)
        .with_context(|| format!("failed to write schedule to {}", path.display()))
}
