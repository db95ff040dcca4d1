use std::collections::HashMap;

use crate::config::Zone;
use crate::models::{Cohort, CohortKey, RawRow};
use crate::normalize::{field, normalize_record};

pub fn cohort_key(row: &RawRow) -> CohortKey {
    CohortKey {
        user_id: field(row, "userId").to_string(),
        job_title: field(row, "jobTitle").to_string(),
        job_location: field(row, "jobLocation").to_string(),
        job_type: field(row, "jobType").to_string(),
        remote: field(row, "remote").to_string(),
        platform: field(row, "platform").to_string(),
        pricing_plan: field(row, "pricingPlan").to_string(),
    }
}

/// Partition rows by search profile. Cohorts come back in first-seen order,
/// and each cohort's records keep input order.
pub fn group_rows(rows: &[RawRow], zone: &Zone) -> Vec<Cohort> {
    let mut index: HashMap<CohortKey, usize> = HashMap::new();
    let mut cohorts: Vec<Cohort> = Vec::new();

    for row in rows {
        let key = cohort_key(row);
        let record = normalize_record(row, zone);
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            cohorts.push(Cohort {
                key,
                records: Vec::new(),
            });
            cohorts.len() - 1
        });
        cohorts[slot].records.push(record);
    }

    cohorts
}
