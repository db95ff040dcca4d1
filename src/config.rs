use std::path::Path;

use anyhow::{anyhow, ensure, Context};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

pub const MIN_BACKOFF_MINUTES: u64 = 1440;
pub const MAX_BACKOFF_HOURS: u64 = 72;
pub const BACKOFF_MULTIPLIER: f64 = 2.0;
pub const SUCCESS_THRESHOLD: u64 = 1;
pub const PRIORITY_PLANS: [i64; 3] = [1, 2, 3];
pub const HEALTHY_SUCCESS_RATE: f64 = 0.7;
pub const HEALTHY_RETRY_MINUTES: u64 = 60;

/// Tunables for the scheduling engine. Every field falls back to its default
/// when missing from the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub min_backoff_minutes: u64,
    pub max_backoff_hours: u64,
    pub backoff_multiplier: f64,
    /// Minimum jobs found for an attempt to count as a success.
    pub success_threshold: u64,
    /// Later entries earn a larger priority bonus.
    pub priority_plans: Vec<i64>,
    /// Success rates strictly above this skip exponential backoff.
    pub healthy_success_rate: f64,
    pub healthy_retry_minutes: u64,
    /// IANA zone name used for naive timestamps and the day boundary.
    /// System local time when unset.
    pub timezone: Option<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_backoff_minutes: MIN_BACKOFF_MINUTES,
            max_backoff_hours: MAX_BACKOFF_HOURS,
            backoff_multiplier: BACKOFF_MULTIPLIER,
            success_threshold: SUCCESS_THRESHOLD,
            priority_plans: PRIORITY_PLANS.to_vec(),
            healthy_success_rate: HEALTHY_SUCCESS_RATE,
            healthy_retry_minutes: HEALTHY_RETRY_MINUTES,
            timezone: None,
        }
    }
}

impl ScheduleConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded schedule config");
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.min_backoff_minutes > 0,
            "min_backoff_minutes must be positive"
        );
        ensure!(self.max_backoff_hours > 0, "max_backoff_hours must be positive");
        ensure!(
            self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0,
            "backoff_multiplier must be at least 1, got {}",
            self.backoff_multiplier
        );
        ensure!(
            (0.0..=1.0).contains(&self.healthy_success_rate),
            "healthy_success_rate must be within 0..=1, got {}",
            self.healthy_success_rate
        );
        self.zone()?;
        Ok(())
    }

    pub fn zone(&self) -> anyhow::Result<Zone> {
        match self.timezone.as_deref() {
            None => Ok(Zone::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(Zone::Named)
                .map_err(|err| anyhow!("unknown timezone '{name}': {err}")),
        }
    }
}

/// Calendar zone that decides where "today" ends and how naive timestamps
/// are read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
    Local,
    Named(Tz),
}

impl Zone {
    pub fn resolve(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Zone::Local => resolve_in(&Local, naive),
            Zone::Named(tz) => resolve_in(tz, naive),
        }
    }

    /// First instant of the calendar day after `now`'s date in this zone.
    pub fn start_of_next_day(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Zone::Local => start_of_next_day_in(&Local, now),
            Zone::Named(tz) => start_of_next_day_in(tz, now),
        }
    }
}

fn start_of_next_day_in<Z: TimeZone>(zone: &Z, now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.with_timezone(zone).date_naive();
    let tomorrow = today.succ_opt().unwrap_or(NaiveDate::MAX);
    resolve_in(zone, tomorrow.and_time(NaiveTime::MIN))
}

// Ambiguous local times take the earlier instant; times inside a DST gap
// move forward one hour.
fn resolve_in<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> DateTime<Utc> {
    zone.from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            zone.from_local_datetime(&(naive + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_constants() {
        let config = ScheduleConfig::default();
        assert_eq!(config.min_backoff_minutes, 1440);
        assert_eq!(config.max_backoff_hours, 72);
        assert_eq!(config.backoff_multiplier, 2.0);
        assert_eq!(config.success_threshold, 1);
        assert_eq!(config.priority_plans, vec![1, 2, 3]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "success_threshold = 3").unwrap();
        writeln!(file, "timezone = \"Europe/Berlin\"").unwrap();

        let config = ScheduleConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.success_threshold, 3);
        assert_eq!(config.max_backoff_hours, 72);
        assert_eq!(config.zone().unwrap(), Zone::Named(chrono_tz::Europe::Berlin));
    }

    #[test]
    fn rejects_bad_values() {
        let config = ScheduleConfig {
            backoff_multiplier: 0.5,
            ..ScheduleConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ScheduleConfig {
            timezone: Some("Mars/Olympus".to_string()),
            ..ScheduleConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn next_day_starts_at_zone_midnight() {
        let zone = Zone::Named(chrono_tz::America::New_York);
        // 2024-03-05 23:30 in New York.
        let now = Utc.with_ymd_and_hms(2024, 3, 6, 4, 30, 0).unwrap();
        let boundary = zone.start_of_next_day(now);
        assert_eq!(boundary, Utc.with_ymd_and_hms(2024, 3, 6, 5, 0, 0).unwrap());
    }

    #[test]
    fn utc_zone_boundary() {
        let zone = Zone::Named(chrono_tz::UTC);
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(
            zone.start_of_next_day(now),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
    }
}
