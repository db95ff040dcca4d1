use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::ScheduleEntry;

pub const TIER_BONUS_STEP: f64 = 100.0;
pub const SUCCESS_WEIGHT: f64 = 50.0;

/// `(position + 1) * 100` by the plan's position in `priority_plans`, so list
/// order rather than the plan number decides the bonus.
pub fn tier_bonus(pricing_plan: i64, priority_plans: &[i64]) -> f64 {
    priority_plans
        .iter()
        .position(|plan| *plan == pricing_plan)
        .map(|index| (index + 1) as f64 * TIER_BONUS_STEP)
        .unwrap_or(0.0)
}

pub fn priority_score(pricing_plan: i64, success_rate: f64, priority_plans: &[i64]) -> f64 {
    tier_bonus(pricing_plan, priority_plans) + success_rate * SUCCESS_WEIGHT
}

/// Orders entries for output. Entries are first ranked by priority, then
/// re-sorted by title, location and platform; the second sort is stable, so
/// priority only breaks ties between identical presentation keys.
pub fn rank(entries: &mut [ScheduleEntry]) {
    entries.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(Ordering::Equal));
    entries.sort_by(|a, b| {
        locale_cmp(&a.key.job_title, &b.key.job_title)
            .then_with(|| locale_cmp(&a.key.job_location, &b.key.job_location))
            .then_with(|| locale_cmp(&a.key.platform, &b.key.platform))
    });
}

/// Entries by descending priority, for summaries.
pub fn by_priority(entries: &[ScheduleEntry]) -> Vec<&ScheduleEntry> {
    let mut ranked: Vec<&ScheduleEntry> = entries.iter().collect();
    ranked.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(Ordering::Equal));
    ranked
}

/// Collation-style comparison: base letters first (accents and case
/// ignored), then unaccented before accented, then lowercase before uppercase.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        .then_with(|| {
            a.nfd()
                .zip(b.nfd())
                .find(|(x, y)| x != y)
                .map(|(x, y)| y.is_lowercase().cmp(&x.is_lowercase()))
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.cmp(b))
}

fn base_letters(value: &str) -> impl Iterator<Item = char> + '_ {
    value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn folded(value: &str) -> impl Iterator<Item = char> + '_ {
    value.nfd().flat_map(char::to_lowercase)
}
