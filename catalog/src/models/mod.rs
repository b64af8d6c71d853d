mod dataset;
mod publication;
mod replica;

pub use dataset::{
    BlockSummary, DatasetQuery, DatasetRecord, FileRecord, dataset_size_gb, parse_tiers,
};
pub use publication::{
    AcquisitionEra, BlockConfig, BulkBlock, DatasetConfig, LumiSection, OutputConfig,
    PrimaryDataset, ProcessingEra, PublishedFile,
};
pub use replica::{ReplicaRecord, SubscriptionLookup, parse_subscription_response};

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Value(f64),
    Text(String),
}

/// Accepts `true`, `1` and `"y"`/`"yes"` style flags; `null` reads as false.
pub(crate) fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Flag>::deserialize(deserializer)? {
        None => false,
        Some(Flag::Bool(flag)) => flag,
        Some(Flag::Number(n)) => n != 0,
        Some(Flag::Text(text)) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "y" | "yes" | "true" | "1"
        ),
    })
}

pub(crate) fn deserialize_optional_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Number::Value(n)) => Ok(Some(n)),
        Some(Number::Text(text)) => text
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
