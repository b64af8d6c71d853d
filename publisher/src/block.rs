use crate::inspect::FileMetadata;
use crate::naming::DatasetName;
use catalog::models::{
    AcquisitionEra, BlockConfig, BulkBlock, DatasetConfig, OutputConfig, PrimaryDataset,
    ProcessingEra, PublishedFile,
};
use uuid::Uuid;

const PRIMARY_DATASET_TYPE: &str = "mc";
const PROCESSING_DESCRIPTION: &str = "LHE_Injection";

/// Settings shared by every block built for one publication.
#[derive(Debug, Clone)]
pub struct BlockContext<'a> {
    pub release: &'a str,
    pub campaign: &'a str,
    pub origin_site: &'a str,
}

pub fn primary_dataset(name: &str) -> PrimaryDataset {
    PrimaryDataset {
        primary_ds_name: name.to_string(),
        primary_ds_type: PRIMARY_DATASET_TYPE.to_string(),
    }
}

pub fn published_file(lfn: &str, metadata: &FileMetadata) -> PublishedFile {
    PublishedFile {
        logical_file_name: lfn.to_string(),
        event_count: metadata.events,
        file_size: metadata.size,
        check_sum: "NOTSET".to_string(),
        adler32: "deadbeef".to_string(),
        file_type: "EDM".to_string(),
        file_lumi_list: metadata.lumis.clone(),
    }
}

/// Assembles a closed block holding `files` in `dataset`.
pub fn build_bulk_block(
    dataset: &DatasetName,
    context: &BlockContext<'_>,
    files: Vec<PublishedFile>,
    now: i64,
    block_id: Uuid,
) -> BulkBlock {
    let block_size = files.iter().map(|f| f.file_size).sum();

    BulkBlock {
        dataset_conf_list: vec![OutputConfig {
            release_version: context.release.to_string(),
            pset_hash: "NoHash".to_string(),
            app_name: "crab".to_string(),
            output_module_label: "o".to_string(),
            global_tag: "NoTag".to_string(),
        }],
        file_conf_list: Vec::new(),
        processing_era: ProcessingEra {
            processing_version: 1,
            description: PROCESSING_DESCRIPTION.to_string(),
        },
        primds: primary_dataset(&dataset.primary),
        dataset: DatasetConfig {
            dataset: dataset.full.clone(),
            processed_ds_name: dataset.processed.clone(),
            data_tier_name: dataset.tier.clone(),
            dataset_access_type: "VALID".to_string(),
            physics_group_name: "NoGroup".to_string(),
            last_modification_date: now,
        },
        acquisition_era: AcquisitionEra {
            acquisition_era_name: context.campaign.to_string(),
            start_date: 0,
        },
        block: BlockConfig {
            block_name: format!("{}#{}", dataset.full, block_id),
            origin_site_name: context.origin_site.to_string(),
            open_for_writing: 0,
            file_count: files.len(),
            block_size,
        },
        files,
        file_parent_list: Vec::new(),
    }
}
