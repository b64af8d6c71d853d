use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PrimaryDataset {
    pub primary_ds_name: String,
    pub primary_ds_type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LumiSection {
    pub run_num: u64,
    pub lumi_section_num: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct OutputConfig {
    pub release_version: String,
    pub pset_hash: String,
    pub app_name: String,
    pub output_module_label: String,
    pub global_tag: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DatasetConfig {
    pub dataset: String,
    pub processed_ds_name: String,
    pub data_tier_name: String,
    pub dataset_access_type: String,
    pub physics_group_name: String,
    pub last_modification_date: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BlockConfig {
    pub block_name: String,
    pub origin_site_name: String,
    pub open_for_writing: u8,
    pub file_count: usize,
    pub block_size: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AcquisitionEra {
    pub acquisition_era_name: String,
    pub start_date: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProcessingEra {
    pub processing_version: u32,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PublishedFile {
    pub logical_file_name: String,
    pub event_count: u64,
    pub file_size: u64,
    pub check_sum: String,
    pub adler32: String,
    pub file_type: String,
    pub file_lumi_list: Vec<LumiSection>,
}

/// Payload of the `bulkblocks` endpoint: one closed block with its files.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BulkBlock {
    pub dataset_conf_list: Vec<OutputConfig>,
    pub file_conf_list: Vec<serde_json::Value>,
    pub files: Vec<PublishedFile>,
    pub processing_era: ProcessingEra,
    pub primds: PrimaryDataset,
    pub dataset: DatasetConfig,
    pub acquisition_era: AcquisitionEra,
    pub block: BlockConfig,
    pub file_parent_list: Vec<serde_json::Value>,
}
