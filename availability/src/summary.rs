use crate::classifier::TriageFlag;
use std::collections::BTreeSet;

/// Per-run accumulator of dataset names by triage outcome. Owned by the
/// batch loop and handed to the report writer at the end.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub checked: usize,
    pub not_cataloged: Vec<String>,
    pub no_complete_copy: Vec<String>,
    pub lost: Vec<String>,
    pub owner_group_risk: Vec<String>,
    pub healthy: Vec<String>,
    pub recent: Vec<String>,
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn record(&mut self, dataset: &str, flags: &BTreeSet<TriageFlag>) {
        self.checked += 1;
        if flags.is_empty() {
            self.recent.push(dataset.to_string());
            return;
        }
        for flag in flags {
            let list = match flag {
                TriageFlag::NotCataloged => &mut self.not_cataloged,
                TriageFlag::NoCompleteCopy => &mut self.no_complete_copy,
                TriageFlag::Lost => &mut self.lost,
                TriageFlag::OwnerGroupRisk => &mut self.owner_group_risk,
                TriageFlag::Healthy => &mut self.healthy,
            };
            list.push(dataset.to_string());
        }
    }

    pub fn record_failure(&mut self, dataset: &str) {
        self.checked += 1;
        self.failed.push(dataset.to_string());
    }

    /// No complete copy anywhere, but some copy above the lost threshold.
    pub fn missing_data(&self) -> Vec<&str> {
        self.without_lost(&self.no_complete_copy)
    }

    /// No complete copy held by the custodial owner group, not already lost.
    pub fn at_risk(&self) -> Vec<&str> {
        self.without_lost(&self.owner_group_risk)
    }

    /// True when every lookup of the run failed, which points at the
    /// remote service rather than at individual datasets.
    pub fn all_failed(&self) -> bool {
        self.checked > 0 && self.failed.len() == self.checked
    }

    fn without_lost<'a>(&'a self, list: &'a [String]) -> Vec<&'a str> {
        list.iter()
            .filter(|ds| !self.lost.contains(*ds))
            .map(String::as_str)
            .collect()
    }
}
