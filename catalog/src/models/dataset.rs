use common::{Error, Result};
use serde::{Deserialize, Serialize};

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// Selection criteria understood by the bookkeeping `datasets` endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetQuery {
    Run(u64),
    Era(String),
    /// Dataset name, `*` wildcards allowed.
    Pattern(String),
    LogicalFile(String),
}

impl DatasetQuery {
    pub fn as_params(&self) -> Vec<(&'static str, String)> {
        match self {
            DatasetQuery::Run(run) => vec![("run_num", run.to_string())],
            DatasetQuery::Era(era) => vec![("acquisition_era_name", era.clone())],
            DatasetQuery::Pattern(pattern) => vec![("dataset", pattern.clone())],
            DatasetQuery::LogicalFile(lfn) => vec![("logical_file_name", lfn.clone())],
        }
    }

    /// Label used in report file names.
    pub fn period(&self) -> String {
        match self {
            DatasetQuery::Run(run) => run.to_string(),
            DatasetQuery::Era(era) => era.clone(),
            DatasetQuery::Pattern(pattern) => pattern.trim_matches('/').replace('/', "_"),
            DatasetQuery::LogicalFile(lfn) => lfn.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatasetRecord {
    pub dataset: String,
    #[serde(default)]
    pub data_tier_name: Option<String>,
}

impl DatasetRecord {
    /// An empty tier list accepts every dataset.
    pub fn matches_tiers(&self, tiers: &[String]) -> bool {
        if tiers.is_empty() {
            return true;
        }
        match &self.data_tier_name {
            Some(tier) => tiers.iter().any(|t| t == tier),
            None => false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BlockSummary {
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub num_file: Option<u64>,
    #[serde(default)]
    pub num_event: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FileRecord {
    pub logical_file_name: String,
    #[serde(default = "default_file_valid", deserialize_with = "super::deserialize_flag")]
    pub is_file_valid: bool,
}

fn default_file_valid() -> bool {
    true
}

/// Splits a comma separated tier list, dropping empty entries.
pub fn parse_tiers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|tier| !tier.is_empty())
        .map(str::to_string)
        .collect()
}

/// Total dataset size in GB (2^30 bytes) from its block summaries.
pub fn dataset_size_gb(dataset: &str, blocks: &[BlockSummary]) -> Result<f64> {
    if blocks.is_empty() {
        return Err(Error::MalformedCatalogResponse(format!(
            "no block summary returned for {}",
            dataset
        )));
    }
    let bytes: u64 = blocks.iter().map(|b| b.file_size).sum();
    Ok(bytes as f64 / BYTES_PER_GB)
}
