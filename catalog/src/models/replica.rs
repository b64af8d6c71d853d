use chrono::{DateTime, TimeZone, Utc};
use common::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One subscription of a dataset onto one storage location.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ReplicaRecord {
    pub location: String,
    /// `None` until the first byte has been transferred.
    pub percent_complete: Option<f64>,
    pub is_custodial: bool,
    pub owner_group: String,
    /// Unix seconds. The epoch when the service omitted `time_create`, so an
    /// undated subscription always counts as old.
    pub created_at: f64,
}

impl ReplicaRecord {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_at.trunc() as i64, 0).single()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionLookup {
    /// The transfer service has never heard of the dataset.
    NotFound,
    Found(Vec<ReplicaRecord>),
}

#[derive(Debug, Deserialize)]
struct RawDataset {
    #[serde(default)]
    subscription: Vec<RawSubscription>,
}

#[derive(Debug, Deserialize)]
struct RawSubscription {
    #[serde(default)]
    node: Option<String>,
    #[serde(default, deserialize_with = "super::deserialize_optional_number")]
    percent_bytes: Option<f64>,
    #[serde(default, deserialize_with = "super::deserialize_flag")]
    custodial: bool,
    #[serde(default)]
    group: Option<String>,
    #[serde(default, deserialize_with = "super::deserialize_optional_number")]
    time_create: Option<f64>,
}

impl From<RawSubscription> for ReplicaRecord {
    fn from(raw: RawSubscription) -> Self {
        for (field, missing) in [
            ("node", raw.node.is_none()),
            ("group", raw.group.is_none()),
            ("time_create", raw.time_create.is_none()),
        ] {
            if missing {
                debug!(field, "Subscription attribute treated as absent");
            }
        }

        ReplicaRecord {
            location: raw.node.unwrap_or_default(),
            percent_complete: raw.percent_bytes,
            is_custodial: raw.custodial,
            owner_group: raw.group.unwrap_or_default(),
            created_at: raw.time_create.unwrap_or(0.0),
        }
    }
}

/// Adapts a `subscriptions` response wrapped in `service_key` into replica
/// records. More than one dataset in the answer is a malformed response.
pub fn parse_subscription_response(body: &str, service_key: &str) -> Result<SubscriptionLookup> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        Error::MalformedCatalogResponse(format!("subscription response is not JSON: {}", e))
    })?;

    let datasets = value
        .get(service_key)
        .and_then(|service| service.get("dataset"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::MalformedCatalogResponse(format!("missing `{}.dataset` array", service_key))
        })?;

    match datasets.as_slice() {
        [] => Ok(SubscriptionLookup::NotFound),
        [entry] => {
            let dataset: RawDataset = serde_json::from_value(entry.clone()).map_err(|e| {
                Error::MalformedCatalogResponse(format!("unexpected subscription record: {}", e))
            })?;
            Ok(SubscriptionLookup::Found(
                dataset.subscription.into_iter().map(ReplicaRecord::from).collect(),
            ))
        }
        many => Err(Error::MalformedCatalogResponse(format!(
            "unexpected number of datasets returned: {}",
            many.len()
        ))),
    }
}
