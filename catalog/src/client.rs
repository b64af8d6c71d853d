use crate::http::{ApiClient, endpoint};
use crate::models::{
    BlockSummary, BulkBlock, DatasetQuery, DatasetRecord, FileRecord, PrimaryDataset,
};
use async_trait::async_trait;
use common::{Error, Result};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Read side of the dataset bookkeeping service.
#[async_trait]
pub trait DatasetCatalog: Send + Sync {
    async fn list_datasets(&self, query: &DatasetQuery) -> Result<Vec<DatasetRecord>>;
    async fn block_summaries(&self, dataset: &str) -> Result<Vec<BlockSummary>>;
    async fn list_files(&self, dataset: &str) -> Result<Vec<FileRecord>>;
}

/// Write side of the bookkeeping service, used for publication.
#[async_trait]
pub trait CatalogWriter: Send + Sync {
    async fn insert_primary_dataset(&self, primary: &PrimaryDataset) -> Result<()>;
    async fn insert_bulk_block(&self, block: &BulkBlock) -> Result<()>;
    async fn update_file_status(&self, logical_file_name: &str, valid: bool) -> Result<()>;
}

pub struct HttpCatalog {
    api: ApiClient,
    reader_url: String,
    writer_url: Option<String>,
}

impl HttpCatalog {
    pub fn reader(api: ApiClient, reader_url: &str) -> Self {
        Self {
            api,
            reader_url: reader_url.to_string(),
            writer_url: None,
        }
    }

    pub fn with_writer(mut self, writer_url: &str) -> Self {
        self.writer_url = Some(writer_url.to_string());
        self
    }

    async fn read<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = endpoint(&self.reader_url, path, params)?;
        let body = self.api.get_text(&url).await?;
        serde_json::from_str(&body).map_err(|e| {
            Error::MalformedCatalogResponse(format!("unexpected `{}` response: {}", path, e))
        })
    }

    fn writer_url(&self) -> Result<&str> {
        self.writer_url
            .as_deref()
            .ok_or_else(|| {
                Error::InvalidInput("catalog writer endpoint not configured".to_string())
            })
    }
}

#[async_trait]
impl DatasetCatalog for HttpCatalog {
    async fn list_datasets(&self, query: &DatasetQuery) -> Result<Vec<DatasetRecord>> {
        let mut params = query.as_params();
        params.push(("detail", "1".to_string()));
        let datasets: Vec<DatasetRecord> = self.read("datasets", &params).await?;
        debug!(?query, count = datasets.len(), "Listed datasets");
        Ok(datasets)
    }

    async fn block_summaries(&self, dataset: &str) -> Result<Vec<BlockSummary>> {
        self.read("blocksummaries", &[("dataset", dataset.to_string())])
            .await
    }

    async fn list_files(&self, dataset: &str) -> Result<Vec<FileRecord>> {
        self.read(
            "files",
            &[("dataset", dataset.to_string()), ("detail", "1".to_string())],
        )
        .await
    }
}

#[async_trait]
impl CatalogWriter for HttpCatalog {
    async fn insert_primary_dataset(&self, primary: &PrimaryDataset) -> Result<()> {
        let url = endpoint(self.writer_url()?, "primarydatasets", &[])?;
        self.api.post_json(&url, &serde_json::to_value(primary)?).await?;
        info!(primary = %primary.primary_ds_name, "Inserted primary dataset");
        Ok(())
    }

    async fn insert_bulk_block(&self, block: &BulkBlock) -> Result<()> {
        let url = endpoint(self.writer_url()?, "bulkblocks", &[])?;
        self.api.post_json(&url, &serde_json::to_value(block)?).await?;
        info!(
            block = %block.block.block_name,
            files = block.files.len(),
            "Inserted block"
        );
        Ok(())
    }

    async fn update_file_status(&self, logical_file_name: &str, valid: bool) -> Result<()> {
        let url = endpoint(
            self.writer_url()?,
            "files",
            &[
                ("logical_file_name", logical_file_name.to_string()),
                ("is_file_valid", if valid { "1" } else { "0" }.to_string()),
            ],
        )?;
        self.api.put(&url).await?;
        info!(file = %logical_file_name, valid, "Updated file status");
        Ok(())
    }
}
