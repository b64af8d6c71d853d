//! Replica availability classification.
//!
//! Every replica of a dataset is put into one of three categories from its
//! transferred fraction, the categories are counted per dataset, and the
//! counts are triaged into the report lists the check produces.

use catalog::models::ReplicaRecord;
use std::collections::BTreeSet;

const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvailabilityCategory {
    Complete,
    Incomplete,
    Missing,
}

/// Aggregate over all replicas of one dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetReport {
    pub present_in_catalog_service: bool,
    pub complete_count: usize,
    pub incomplete_count: usize,
    /// Complete replicas held by the custodial owner group.
    pub group_complete_count: usize,
    pub earliest_subscription_time: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TriageFlag {
    NotCataloged,
    NoCompleteCopy,
    Lost,
    OwnerGroupRisk,
    Healthy,
}

/// A replica at or below `lost_threshold` percent counts as missing.
pub fn classify(percent_complete: Option<f64>, lost_threshold: f64) -> AvailabilityCategory {
    match percent_complete {
        None => AvailabilityCategory::Missing,
        Some(percent) if percent >= 100.0 => AvailabilityCategory::Complete,
        Some(percent) if percent > lost_threshold => AvailabilityCategory::Incomplete,
        Some(_) => AvailabilityCategory::Missing,
    }
}

pub fn summarize(
    replicas: &[ReplicaRecord],
    lost_threshold: f64,
    custodial_owner_group: &str,
) -> DatasetReport {
    if replicas.is_empty() {
        return DatasetReport::default();
    }

    let mut report = DatasetReport {
        present_in_catalog_service: true,
        ..DatasetReport::default()
    };

    for replica in replicas {
        match classify(replica.percent_complete, lost_threshold) {
            AvailabilityCategory::Complete => {
                report.complete_count += 1;
                if replica.owner_group == custodial_owner_group {
                    report.group_complete_count += 1;
                }
            }
            AvailabilityCategory::Incomplete => report.incomplete_count += 1,
            AvailabilityCategory::Missing => {}
        }

        report.earliest_subscription_time = Some(match report.earliest_subscription_time {
            Some(earliest) => earliest.min(replica.created_at),
            None => replica.created_at,
        });
    }

    report
}

/// Returns an empty set when the first subscription is younger than the
/// grace period; such datasets are skipped for this run.
pub fn triage(
    report: &DatasetReport,
    recent_subscription_grace_days: f64,
    now_timestamp: f64,
) -> BTreeSet<TriageFlag> {
    let mut flags = BTreeSet::new();

    if !report.present_in_catalog_service {
        flags.insert(TriageFlag::NotCataloged);
        return flags;
    }

    if let Some(earliest) = report.earliest_subscription_time {
        if now_timestamp - earliest < recent_subscription_grace_days * SECONDS_PER_DAY {
            return flags;
        }
    }

    if report.complete_count == 0 {
        flags.insert(TriageFlag::NoCompleteCopy);
        if report.incomplete_count == 0 {
            flags.insert(TriageFlag::Lost);
        }
    }
    if report.group_complete_count == 0 {
        flags.insert(TriageFlag::OwnerGroupRisk);
    }
    if flags.is_empty() {
        flags.insert(TriageFlag::Healthy);
    }

    flags
}
