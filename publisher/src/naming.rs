use common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;

static FILE_STEM_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^/]+)\.root$").expect("Invalid file stem regex"));

static DIRECTORY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^/]+)/[^/]+\.root$").expect("Invalid directory regex"));

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-v(\d+)/[^/]+$").expect("Invalid version regex"));

/// `/store/user/x/sample_1.root` -> `sample_1`
pub fn file_stem(lfn: &str) -> Option<&str> {
    FILE_STEM_REGEX
        .captures(lfn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `/store/user/x/sample_1.root` -> `x`
pub fn directory_name(lfn: &str) -> Option<&str> {
    DIRECTORY_REGEX
        .captures(lfn)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Uses the override when given, else the file name of a single file, else
/// the directory holding the first file.
pub fn primary_dataset_name(files: &[String], override_name: Option<&str>) -> Result<String> {
    let name = match (override_name, files) {
        (Some(name), _) => Some(name),
        (None, [single]) => file_stem(single),
        (None, [first, ..]) => directory_name(first),
        (None, []) => None,
    };

    match name {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(Error::InvalidInput(
            "Failed to get primary dataset name".to_string(),
        )),
    }
}

/// Catalog wildcard matching every version of a dataset.
pub fn dataset_pattern(primary: &str, campaign: &str, info: &str, tier: &str) -> String {
    format!("/{}/{}-{}-v*/{}", primary, campaign, info, tier)
}

pub fn versioned_dataset_name(
    primary: &str,
    campaign: &str,
    info: &str,
    version: u32,
    tier: &str,
) -> String {
    format!("/{}/{}-{}-v{}/{}", primary, campaign, info, version, tier)
}

/// Highest `-v<N>` processed-name version among `names`.
pub fn max_version<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<u32> {
    names
        .into_iter()
        .filter_map(|name| VERSION_REGEX.captures(name))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
}

/// Version to use for a new dataset, given the names already published.
pub fn next_version<'a>(names: impl IntoIterator<Item = &'a str>) -> u32 {
    max_version(names).map_or(1, |max| max + 1)
}

/// `/Primary/Processed/TIER` split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetName {
    pub full: String,
    pub primary: String,
    pub processed: String,
    pub tier: String,
}

impl DatasetName {
    pub fn parse(name: &str) -> Result<Self> {
        let parts: Vec<&str> = name.split('/').collect();
        match parts.as_slice() {
            ["", primary, processed, tier]
                if !primary.is_empty() && !processed.is_empty() && !tier.is_empty() =>
            {
                Ok(Self {
                    full: name.to_string(),
                    primary: primary.to_string(),
                    processed: processed.to_string(),
                    tier: tier.to_string(),
                })
            }
            _ => Err(Error::InvalidInput(format!(
                "Dataset name must look like /Primary/Processed/TIER: {}",
                name
            ))),
        }
    }
}
