use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::config::Zone;
use crate::models::{AttemptRecord, RawRow};

pub const CREATED_AT: &str = "createdAt";
pub const TOTAL_JOBS: &str = "totalJobs";
pub const NEW_JOBS: &str = "newJobs";
pub const TIME_TAKEN: &str = "timeTaken";

const NAIVE_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

pub fn field<'a>(row: &'a RawRow, name: &str) -> &'a str {
    row.get(name).map(String::as_str).unwrap_or("")
}

pub fn normalize_record(row: &RawRow, zone: &Zone) -> AttemptRecord {
    AttemptRecord {
        timestamp: parse_timestamp(field(row, CREATED_AT), zone),
        total_jobs_found: parse_count(field(row, TOTAL_JOBS)),
        new_jobs_found: parse_count(field(row, NEW_JOBS)),
        duration_seconds: parse_seconds(field(row, TIME_TAKEN)),
    }
}

/// Non-negative integer, truncating decimals. Anything unusable is 0.
pub fn parse_count(value: &str) -> u64 {
    let value = value.trim();
    if let Ok(count) = value.parse::<u64>() {
        return count;
    }
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() && number > 0.0 => number.trunc() as u64,
        _ => 0,
    }
}

pub fn parse_signed(value: &str) -> i64 {
    let value = value.trim();
    if let Ok(number) = value.parse::<i64>() {
        return number;
    }
    match value.parse::<f64>() {
        Ok(number) if number.is_finite() => number.trunc() as i64,
        _ => 0,
    }
}

pub fn parse_seconds(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds > 0.0 => seconds,
        _ => 0.0,
    }
}

/// Offset-bearing timestamps are absolute, naive ones are read in `zone`,
/// and a bare ISO date is UTC midnight.
pub fn parse_timestamp(value: &str, zone: &Zone) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(zone.resolve(naive));
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}
