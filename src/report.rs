use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::models::{PlatformSummary, ScheduleEntry};
use crate::priority;

pub fn summarize_by_platform(entries: &[ScheduleEntry]) -> Vec<PlatformSummary> {
    let mut map: std::collections::HashMap<&str, (usize, usize, f64)> =
        std::collections::HashMap::new();

    for entry in entries {
        let slot = map.entry(entry.key.platform.as_str()).or_insert((0, 0, 0.0));
        slot.0 += 1;
        if entry.run_today {
            slot.1 += 1;
        }
        slot.2 += entry.stats.success_rate;
    }

    let mut summaries: Vec<PlatformSummary> = map
        .into_iter()
        .map(|(platform, (count, due, rate_sum))| PlatformSummary {
            platform: platform.to_string(),
            cohort_count: count,
            run_today_count: due,
            avg_success_rate: if count == 0 {
                0.0
            } else {
                rate_sum / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.cohort_count
            .cmp(&a.cohort_count)
            .then_with(|| a.platform.cmp(&b.platform))
    });
    summaries
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

fn describe(entry: &ScheduleEntry) -> String {
    let platform = if entry.key.platform.is_empty() {
        "unknown platform"
    } else {
        entry.key.platform.as_str()
    };
    format!(
        "{} in {} on {} for {} (plan {})",
        entry.key.job_title,
        entry.key.job_location,
        platform,
        entry.key.user_id,
        entry.key.pricing_plan
    )
}

pub fn build_report(entries: &[ScheduleEntry], generated_at: DateTime<Utc>) -> String {
    let summaries = summarize_by_platform(entries);

    let searches: usize = entries.iter().map(|e| e.stats.total_searches).sum();
    let jobs: u64 = entries.iter().map(|e| e.stats.total_jobs_found).sum();
    let new_jobs: u64 = entries.iter().map(|e| e.stats.total_new_jobs).sum();
    let seconds: f64 = entries.iter().map(|e| e.stats.total_duration_seconds).sum();
    let successes: f64 = entries
        .iter()
        .map(|e| e.stats.success_rate * e.stats.total_searches as f64)
        .sum();
    let due = entries.iter().filter(|e| e.run_today).count();

    let mut output = String::new();

    let _ = writeln!(output, "# Search Schedule Report");
    let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Cohorts: {} ({} due today)", entries.len(), due);
    let _ = writeln!(output, "- Searches: {searches}");
    let _ = writeln!(output, "- Jobs found: {jobs} ({new_jobs} new)");
    let _ = writeln!(
        output,
        "- Jobs per search: {:.2}",
        ratio(jobs as f64, searches as f64)
    );
    let _ = writeln!(
        output,
        "- Average search time: {:.1}s",
        ratio(seconds, searches as f64)
    );
    let _ = writeln!(
        output,
        "- Overall success rate: {:.0}%",
        ratio(successes, searches as f64) * 100.0
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Platform Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No search history recorded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} cohorts, {} due today (avg success {:.2})",
                summary.platform,
                summary.cohort_count,
                summary.run_today_count,
                summary.avg_success_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Priority Cohorts");

    if entries.is_empty() {
        let _ = writeln!(output, "No cohorts to rank.");
    } else {
        for entry in priority::by_priority(entries).into_iter().take(10) {
            let _ = writeln!(
                output,
                "- {} priority {:.2}, success {:.2}, {}",
                describe(entry),
                entry.priority,
                entry.stats.success_rate,
                if entry.run_today { "runs today" } else { "waiting" }
            );
        }
    }

    let mut streaks: Vec<&ScheduleEntry> = entries
        .iter()
        .filter(|e| e.stats.consecutive_failures > 0)
        .collect();
    streaks.sort_by(|a, b| b.stats.consecutive_failures.cmp(&a.stats.consecutive_failures));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Longest Failure Streaks");

    if streaks.is_empty() {
        let _ = writeln!(output, "Every cohort found jobs on its latest search.");
    } else {
        for entry in streaks.iter().take(5) {
            let _ = writeln!(
                output,
                "- {}: {} failed searches in a row",
                describe(entry),
                entry.stats.consecutive_failures
            );
        }
    }

    output
}
