pub mod client;
pub mod http;
pub mod models;
pub mod subscriptions;
pub mod utils;

pub use client::{CatalogWriter, DatasetCatalog, HttpCatalog};
pub use http::ApiClient;
pub use subscriptions::{HttpSubscriptionSource, SubscriptionSource};

use common::Result;
use models::{DatasetQuery, DatasetRecord};
use tracing::info;

/// Lists the datasets selected by `query`, keeping only the given tiers.
pub async fn select_datasets(
    catalog: &dyn DatasetCatalog,
    query: &DatasetQuery,
    tiers: &[String],
) -> Result<Vec<DatasetRecord>> {
    let datasets = catalog.list_datasets(query).await?;
    let total = datasets.len();
    let selected: Vec<DatasetRecord> = datasets
        .into_iter()
        .filter(|ds| ds.matches_tiers(tiers))
        .collect();

    info!(total, selected = selected.len(), ?tiers, "Selected datasets");
    Ok(selected)
}
