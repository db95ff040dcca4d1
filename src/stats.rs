use chrono::{DateTime, Utc};

use crate::models::{AttemptRecord, Cohort, CohortStatistics};

pub const RECENT_SEARCH_LIMIT: usize = 10;

pub fn is_successful(record: &AttemptRecord, threshold: u64) -> bool {
    record.total_jobs_found >= threshold
}

/// Sort newest first. The sort is stable and `None` orders below every
/// valid instant, so unparseable timestamps land at the end.
pub fn sort_newest_first(records: &mut [AttemptRecord]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

pub fn compute_statistics(
    cohort: &Cohort,
    success_threshold: u64,
    now: DateTime<Utc>,
) -> CohortStatistics {
    let mut records = cohort.records.clone();
    sort_newest_first(&mut records);

    let total_searches = records.len();
    let successful = records
        .iter()
        .filter(|record| is_successful(record, success_threshold))
        .count();
    let success_rate = if total_searches == 0 {
        0.0
    } else {
        successful as f64 / total_searches as f64
    };

    let consecutive_failures = records
        .iter()
        .take_while(|record| !is_successful(record, success_threshold))
        .count();

    let last_search_time = match records.first() {
        Some(newest) => newest.timestamp,
        None => Some(now),
    };

    CohortStatistics {
        total_searches,
        total_jobs_found: records.iter().map(|r| r.total_jobs_found).sum(),
        total_new_jobs: records.iter().map(|r| r.new_jobs_found).sum(),
        total_duration_seconds: records.iter().map(|r| r.duration_seconds).sum(),
        success_rate,
        last_search_time,
        consecutive_failures,
        recent_searches: records.into_iter().take(RECENT_SEARCH_LIMIT).collect(),
    }
}
