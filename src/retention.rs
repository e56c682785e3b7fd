//! Tiered retention classification over an ordered backup set.
//!
//! Three buckets with independent capacities: daily (keyless, first N
//! records), weekly (one per ISO week), monthly (one per calendar month).
//! Classification is a pure function of the ordered records and the policy;
//! nothing is persisted between runs.

use std::collections::HashSet;
use std::fmt;

use chrono::Datelike;

use crate::repository::BackupRecord;

/// How many backups each tier retains. A count of 0 disables the tier.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    pub keep_daily: u32,
    pub keep_weekly: u32,
    pub keep_monthly: u32,
}

/// The highest-priority bucket that admitted a kept record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    Monthly,
    Weekly,
    Daily,
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeepReason::Monthly => write!(f, "monthly"),
            KeepReason::Weekly => write!(f, "weekly"),
            KeepReason::Daily => write!(f, "daily"),
        }
    }
}

/// Result of one classification pass.
#[derive(Debug, Default)]
pub struct Classification {
    pub kept: Vec<(BackupRecord, KeepReason)>,
    pub to_delete: Vec<BackupRecord>,
}

/// Partition `records` into kept and delete sets.
///
/// `records` must already be in descending date order (the repository
/// produces them that way). Every record is checked against all three
/// buckets in priority order monthly > weekly > daily, and admission is
/// non-exclusive: a single recent backup may occupy its month's slot, its
/// week's slot, and a daily slot at the same time. A record lands in
/// `to_delete` only when no bucket admits it.
pub fn classify(records: Vec<BackupRecord>, policy: &RetentionPolicy) -> Classification {
    let mut monthly_seen: HashSet<(i32, u32)> = HashSet::new();
    let mut weekly_seen: HashSet<(i32, u32)> = HashSet::new();
    let mut daily_count: u32 = 0;

    let mut result = Classification::default();

    for record in records {
        let month_key = (record.date.year(), record.date.month());
        let iso = record.date.iso_week();
        let week_key = (iso.year(), iso.week());

        let monthly = (monthly_seen.len() as u32) < policy.keep_monthly
            && !monthly_seen.contains(&month_key);
        if monthly {
            monthly_seen.insert(month_key);
        }

        let weekly =
            (weekly_seen.len() as u32) < policy.keep_weekly && !weekly_seen.contains(&week_key);
        if weekly {
            weekly_seen.insert(week_key);
        }

        let daily = daily_count < policy.keep_daily;
        if daily {
            daily_count += 1;
        }

        if monthly {
            result.kept.push((record, KeepReason::Monthly));
        } else if weekly {
            result.kept.push((record, KeepReason::Weekly));
        } else if daily {
            result.kept.push((record, KeepReason::Daily));
        } else {
            result.to_delete.push(record);
        }
    }

    result
}
