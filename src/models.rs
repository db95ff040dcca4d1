use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::normalize::parse_signed;

/// One row of input as read from a tabular file: column name to cell text.
pub type RawRow = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    /// `None` when `createdAt` could not be parsed; sorts as the earliest instant.
    pub timestamp: Option<DateTime<Utc>>,
    pub total_jobs_found: u64,
    pub new_jobs_found: u64,
    pub duration_seconds: f64,
}

/// Identity of one recurring search profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CohortKey {
    pub user_id: String,
    pub job_title: String,
    pub job_location: String,
    pub job_type: String,
    pub remote: String,
    pub platform: String,
    /// Raw plan text as read, so `"free"` and `"pro"` stay distinct.
    pub pricing_plan: String,
}

impl CohortKey {
    /// Integer tier used for scoring and output; non-numeric plans are 0.
    pub fn plan_tier(&self) -> i64 {
        parse_signed(&self.pricing_plan)
    }
}

#[derive(Debug, Clone)]
pub struct Cohort {
    pub key: CohortKey,
    pub records: Vec<AttemptRecord>,
}

#[derive(Debug, Clone)]
pub struct CohortStatistics {
    pub total_searches: usize,
    pub total_jobs_found: u64,
    pub total_new_jobs: u64,
    pub total_duration_seconds: f64,
    pub success_rate: f64,
    pub last_search_time: Option<DateTime<Utc>>,
    pub consecutive_failures: usize,
    /// Newest first, at most ten records.
    pub recent_searches: Vec<AttemptRecord>,
}

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub key: CohortKey,
    pub stats: CohortStatistics,
    pub priority: f64,
    pub run_today: bool,
}

#[derive(Debug, Clone)]
pub struct PlatformSummary {
    pub platform: String,
    pub cohort_count: usize,
    pub run_today_count: usize,
    pub avg_success_rate: f64,
}
