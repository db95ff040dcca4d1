use chrono::{DateTime, Duration, Utc};

use crate::config::{ScheduleConfig, Zone};
use crate::models::CohortStatistics;

pub fn backoff_minutes(consecutive_failures: usize, config: &ScheduleConfig) -> f64 {
    let exponent = i32::try_from(consecutive_failures).unwrap_or(i32::MAX);
    let delay = config.min_backoff_minutes as f64 * config.backoff_multiplier.powi(exponent);
    delay.min(config.max_backoff_hours as f64 * 60.0)
}

/// Healthy cohorts (success rate above `healthy_success_rate`) retry after
/// `healthy_retry_minutes`; everything else waits out the capped backoff.
pub fn retry_delay(stats: &CohortStatistics, config: &ScheduleConfig) -> Duration {
    let minutes = if stats.success_rate > config.healthy_success_rate {
        config.healthy_retry_minutes as f64
    } else {
        backoff_minutes(stats.consecutive_failures, config)
    };
    // Float-to-int casts saturate, so oversized configs clamp instead of panicking.
    Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

/// `None` when the cohort has no usable timestamp to count from.
pub fn next_search_time(
    stats: &CohortStatistics,
    config: &ScheduleConfig,
) -> Option<DateTime<Utc>> {
    let last = stats.last_search_time?;
    Some(
        last.checked_add_signed(retry_delay(stats, config))
            .unwrap_or(DateTime::<Utc>::MAX_UTC),
    )
}

/// Due before the next calendar midnight in `zone`. A cohort with no usable
/// timestamp has no comparable next time and is never due.
pub fn run_today(next: Option<DateTime<Utc>>, now: DateTime<Utc>, zone: &Zone) -> bool {
    match next {
        Some(next) => next < zone.start_of_next_day(now),
        None => false,
    }
}
