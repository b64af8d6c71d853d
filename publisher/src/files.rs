use catalog::DatasetCatalog;
use catalog::models::{DatasetQuery, FileRecord};
use common::Result;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Files from the comma separated `list` followed by the non-blank lines of
/// `file`.
pub fn collect_candidates(list: Option<&str>, file: Option<&Path>) -> Result<Vec<String>> {
    let mut candidates: Vec<String> = list
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|lfn| !lfn.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if let Some(path) = file {
        let content = std::fs::read_to_string(path)?;
        candidates.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
        );
    }

    Ok(candidates)
}

pub fn is_root_file(lfn: &str) -> bool {
    lfn.ends_with(".root")
}

/// Drops non-ROOT files and files the catalog already knows about.
pub async fn validate_files(
    catalog: &dyn DatasetCatalog,
    candidates: &[String],
) -> Result<Vec<String>> {
    let mut valid = Vec::new();
    for lfn in candidates {
        if !is_root_file(lfn) {
            println!("Not a ROOT file: {} skipped", lfn);
            continue;
        }
        let owners = catalog
            .list_datasets(&DatasetQuery::LogicalFile(lfn.clone()))
            .await?;
        if !owners.is_empty() {
            let names: Vec<&str> = owners.iter().map(|ds| ds.dataset.as_str()).collect();
            println!(
                "File {} is already known to the catalog ({}). Skipped",
                lfn,
                names.join(", ")
            );
            continue;
        }
        valid.push(lfn.clone());
    }
    debug!(candidates = candidates.len(), valid = valid.len(), "Validated files");
    Ok(valid)
}

/// What has to happen to the dataset for the given files to be published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicationPlan {
    pub to_publish: Vec<String>,
    /// Already in the dataset but flagged invalid.
    pub to_revalidate: Vec<String>,
}

impl PublicationPlan {
    pub fn new(files: &[String], existing: &[FileRecord]) -> Self {
        let known: HashSet<&str> = existing
            .iter()
            .map(|f| f.logical_file_name.as_str())
            .collect();
        let valid: HashSet<&str> = existing
            .iter()
            .filter(|f| f.is_file_valid)
            .map(|f| f.logical_file_name.as_str())
            .collect();

        let mut plan = Self::default();
        for lfn in files {
            if !known.contains(lfn.as_str()) {
                plan.to_publish.push(lfn.clone());
            } else if !valid.contains(lfn.as_str()) {
                plan.to_revalidate.push(lfn.clone());
            }
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.to_publish.is_empty() && self.to_revalidate.is_empty()
    }
}
