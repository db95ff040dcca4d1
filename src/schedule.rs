use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::backoff;
use crate::cohort;
use crate::config::{ScheduleConfig, Zone};
use crate::models::{Cohort, RawRow, ScheduleEntry};
use crate::priority;
use crate::stats;

pub struct Scheduler {
    config: ScheduleConfig,
    zone: Zone,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let zone = config.zone()?;
        Ok(Self { config, zone })
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Group, score and order `rows`. `now` decides both the empty-cohort
    /// fallback time and which calendar day counts as today.
    pub fn build(&self, rows: &[RawRow], now: DateTime<Utc>) -> Vec<ScheduleEntry> {
        let cohorts = cohort::group_rows(rows, &self.zone);
        debug!(rows = rows.len(), cohorts = cohorts.len(), "grouped attempt records");

        let mut entries: Vec<ScheduleEntry> = cohorts
            .iter()
            .map(|cohort| self.evaluate(cohort, now))
            .collect();
        priority::rank(&mut entries);

        let due = entries.iter().filter(|entry| entry.run_today).count();
        info!(cohorts = entries.len(), due, "built search schedule");
        entries
    }

    pub fn evaluate(&self, cohort: &Cohort, now: DateTime<Utc>) -> ScheduleEntry {
        let stats = stats::compute_statistics(cohort, self.config.success_threshold, now);
        let next = backoff::next_search_time(&stats, &self.config);
        let run_today = backoff::run_today(next, now, &self.zone);
        let priority = priority::priority_score(
            cohort.key.plan_tier(),
            stats.success_rate,
            &self.config.priority_plans,
        );

        ScheduleEntry {
            key: cohort.key.clone(),
            stats,
            priority,
            run_today,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn utc_scheduler() -> Scheduler {
        Scheduler::new(ScheduleConfig {
            timezone: Some("UTC".to_string()),
            ..ScheduleConfig::default()
        })
        .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
    }

    fn sample_row(user: &str, plan: &str, created_at: DateTime<Utc>, total: u64) -> RawRow {
        [
            ("userId", user.to_string()),
            ("jobTitle", "Backend Engineer".to_string()),
            ("jobLocation", "Lisbon".to_string()),
            ("jobType", "full-time".to_string()),
            ("remote", "yes".to_string()),
            ("platform", "linkedin".to_string()),
            ("pricingPlan", plan.to_string()),
            ("createdAt", created_at.to_rfc3339()),
            ("totalJobs", total.to_string()),
            ("newJobs", "0".to_string()),
            ("timeTaken", "12.5".to_string()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn empty_input_yields_empty_schedule() {
        assert!(utc_scheduler().build(&[], now()).is_empty());
    }

    #[test]
    fn healthy_cohort_searched_this_morning_runs_today() {
        let rows = vec![
            sample_row("u1", "3", now() - Duration::hours(2), 4),
            sample_row("u1", "3", now() - Duration::days(1), 6),
        ];
        let entries = utc_scheduler().build(&rows, now());
        assert_eq!(entries.len(), 1);
        assert!(entries[0].run_today);
        assert_eq!(entries[0].priority, 350.0);
    }

    #[test]
    fn failing_cohort_waits() {
        let rows = vec![
            sample_row("u2", "1", now() - Duration::days(2), 3),
            sample_row("u2", "1", now() - Duration::days(1), 0),
            sample_row("u2", "1", now() - Duration::hours(1), 0),
        ];
        let entries = utc_scheduler().build(&rows, now());
        let entry = &entries[0];
        assert_eq!(entry.stats.consecutive_failures, 2);
        // Last search an hour ago plus 72h is well past tonight.
        assert!(!entry.run_today);
        assert!((entry.priority - (100.0 + 50.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn stale_failing_cohort_is_due() {
        let rows = vec![sample_row("u3", "7", now() - Duration::days(5), 0)];
        let entries = utc_scheduler().build(&rows, now());
        assert!(entries[0].run_today);
        assert_eq!(entries[0].priority, 0.0);
    }

    #[test]
    fn cohort_without_valid_timestamps_is_not_due() {
        let mut row = sample_row("u4", "2", now(), 0);
        row.insert("createdAt".to_string(), "not a date".to_string());
        let entries = utc_scheduler().build(&[row.clone(), row], now());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].stats.last_search_time, None);
        assert!(!entries[0].run_today);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ScheduleConfig {
            min_backoff_minutes: 0,
            ..ScheduleConfig::default()
        };
        assert!(Scheduler::new(config).is_err());
    }

    fn identity(row: &RawRow) -> Vec<String> {
        [
            "userId",
            "jobTitle",
            "jobLocation",
            "jobType",
            "remote",
            "platform",
            "pricingPlan",
        ]
        .iter()
        .map(|name| row.get(*name).cloned().unwrap_or_default())
        .collect()
    }

    fn entry_identity(entry: &ScheduleEntry) -> Vec<String> {
        let key = &entry.key;
        vec![
            key.user_id.clone(),
            key.job_title.clone(),
            key.job_location.clone(),
            key.job_type.clone(),
            key.remote.clone(),
            key.platform.clone(),
            key.pricing_plan.clone(),
        ]
    }

    #[test]
    fn distinct_plan_texts_get_their_own_entries() {
        let rows: Vec<RawRow> = ["free", "pro", "2", "2.0"]
            .iter()
            .map(|plan| sample_row("u1", plan, now() - Duration::days(2), 1))
            .collect();
        let entries = utc_scheduler().build(&rows, now());
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().all(|e| e.stats.total_searches == 1));

        let mut priorities: Vec<f64> = entries.iter().map(|e| e.priority).collect();
        priorities.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(priorities, vec![50.0, 50.0, 250.0, 250.0]);
    }

    fn arb_row() -> impl Strategy<Value = RawRow> {
        (
            prop::sample::select(vec!["u1", "u2", "u3"]),
            prop::sample::select(vec!["1", "2", "2.0", "3", "free", "pro", ""]),
            prop::sample::select(vec!["indeed", "linkedin"]),
            0i64..2_000,
            0u64..4,
        )
            .prop_map(|(user, plan, platform, minutes_ago, total)| {
                let created_at = now() - Duration::minutes(minutes_ago * 7);
                let mut row = sample_row(user, plan, created_at, total);
                row.insert("platform".to_string(), platform.to_string());
                row
            })
    }

    proptest! {
        #[test]
        fn one_entry_per_distinct_key(rows in prop::collection::vec(arb_row(), 0..40)) {
            let scheduler = utc_scheduler();
            let entries = scheduler.build(&rows, now());

            let keys: HashSet<Vec<String>> = rows.iter().map(identity).collect();
            let entry_keys: HashSet<Vec<String>> = entries.iter().map(entry_identity).collect();
            prop_assert_eq!(entries.len(), keys.len());
            prop_assert_eq!(entry_keys, keys);

            let searches: usize = entries.iter().map(|e| e.stats.total_searches).sum();
            prop_assert_eq!(searches, rows.len());
        }

        #[test]
        fn statistics_stay_in_bounds(rows in prop::collection::vec(arb_row(), 1..40)) {
            let scheduler = utc_scheduler();
            for entry in scheduler.build(&rows, now()) {
                let stats = &entry.stats;
                prop_assert!((0.0..=1.0).contains(&stats.success_rate));
                prop_assert!(stats.consecutive_failures <= stats.total_searches);
                prop_assert!(stats.recent_searches.len() <= 10);
                if let Some(newest) = stats.recent_searches.first() {
                    if newest.total_jobs_found >= scheduler.config().success_threshold {
                        prop_assert_eq!(stats.consecutive_failures, 0);
                    }
                }
            }
        }

        #[test]
        fn rebuilding_is_idempotent(rows in prop::collection::vec(arb_row(), 0..30)) {
            let scheduler = utc_scheduler();
            let first = scheduler.build(&rows, now());
            let second = scheduler.build(&rows, now());
            prop_assert_eq!(first.len(), second.len());
            for (a, b) in first.iter().zip(second.iter()) {
                prop_assert_eq!(&a.key, &b.key);
                prop_assert_eq!(a.priority, b.priority);
                prop_assert_eq!(a.run_today, b.run_today);
                prop_assert_eq!(&a.stats.recent_searches, &b.stats.recent_searches);
            }
        }
    }
}
