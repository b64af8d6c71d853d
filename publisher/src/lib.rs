pub mod block;
pub mod files;
pub mod inspect;
pub mod naming;

use block::{BlockContext, build_bulk_block, primary_dataset, published_file};
use catalog::models::DatasetQuery;
use catalog::{ApiClient, CatalogWriter, DatasetCatalog, HttpCatalog};
use common::config::Settings;
use common::{Error, Result};
use files::{PublicationPlan, validate_files};
use inspect::{FileInspector, XrootdInspector};
use naming::{
    DatasetName, dataset_pattern, next_version, primary_dataset_name, versioned_dataset_name,
};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub files: Vec<String>,
    pub primary: Option<String>,
    pub dataset: Option<String>,
    pub campaign: String,
    pub info: String,
    pub tier: String,
    pub release: String,
    pub origin_site: String,
    /// Without it nothing is written to the catalog.
    pub publish: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PublicationOutcome {
    UpToDate { dataset: String },
    DryRun { dataset: String, plan: PublicationPlan },
    Published {
        dataset: String,
        published: usize,
        revalidated: usize,
    },
}

/// Publishes against the configured bookkeeping instances, reading file
/// metadata over XRootD.
pub async fn publish(settings: &Settings, options: &PublishOptions) -> Result<PublicationOutcome> {
    let publication = &settings.publication;
    let catalog = HttpCatalog::reader(ApiClient::new(settings)?, &publication.reader_url)
        .with_writer(&publication.writer_url);
    let inspector = XrootdInspector::new(
        &publication.stat_command,
        &publication.inspect_command,
        &publication.xrootd_redirector,
    );
    run_publication(&catalog, &catalog, &inspector, options).await
}

/// Name of the dataset the files go into: the override when given, else the
/// next free version of `/<primary>/<campaign>-<info>-v<N>/<tier>`.
pub async fn resolve_dataset_name(
    reader: &dyn DatasetCatalog,
    primary: &str,
    options: &PublishOptions,
) -> Result<DatasetName> {
    if let Some(name) = &options.dataset {
        return DatasetName::parse(name);
    }

    let pattern = dataset_pattern(primary, &options.campaign, &options.info, &options.tier);
    let existing = reader
        .list_datasets(&DatasetQuery::Pattern(pattern))
        .await?;
    let version = next_version(existing.iter().map(|ds| ds.dataset.as_str()));
    debug!(primary, version, existing = existing.len(), "Resolved dataset version");

    DatasetName::parse(&versioned_dataset_name(
        primary,
        &options.campaign,
        &options.info,
        version,
        &options.tier,
    ))
}

pub async fn run_publication(
    reader: &dyn DatasetCatalog,
    writer: &dyn CatalogWriter,
    inspector: &dyn FileInspector,
    options: &PublishOptions,
) -> Result<PublicationOutcome> {
    let files = validate_files(reader, &options.files).await?;
    if files.is_empty() {
        return Err(Error::InvalidInput("Nothing to publish".to_string()));
    }

    let primary = primary_dataset_name(&files, options.primary.as_deref())?;
    let dataset = resolve_dataset_name(reader, &primary, options).await?;
    println!("Dataset: {}", dataset.full);

    let existing = reader.list_files(&dataset.full).await?;
    let plan = PublicationPlan::new(&files, &existing);
    println!("Files in the dataset: {}", existing.len());
    println!("Files to publish: {}", plan.to_publish.len());
    println!("Files to revalidate: {}", plan.to_revalidate.len());

    if plan.is_empty() {
        println!("Dataset {} is up to date", dataset.full);
        return Ok(PublicationOutcome::UpToDate {
            dataset: dataset.full,
        });
    }

    let mut published = Vec::with_capacity(plan.to_publish.len());
    for lfn in &plan.to_publish {
        let metadata = inspector.inspect(lfn).await?;
        published.push(published_file(lfn, &metadata));
    }

    let context = BlockContext {
        release: &options.release,
        campaign: &options.campaign,
        origin_site: &options.origin_site,
    };
    let block = build_bulk_block(
        &dataset,
        &context,
        published,
        chrono::Utc::now().timestamp(),
        Uuid::new_v4(),
    );
    if options.verbose {
        println!("{}", serde_json::to_string_pretty(&block)?);
    }

    if !options.publish {
        println!("Dry run: nothing was written to the catalog. Use --publish to publish.");
        return Ok(PublicationOutcome::DryRun {
            dataset: dataset.full,
            plan,
        });
    }

    writer.insert_primary_dataset(&primary_dataset(&primary)).await?;
    if !block.files.is_empty() {
        writer.insert_bulk_block(&block).await?;
    }
    for lfn in &plan.to_revalidate {
        writer.update_file_status(lfn, true).await?;
    }

    info!(
        dataset = %dataset.full,
        published = block.files.len(),
        revalidated = plan.to_revalidate.len(),
        "Publication finished"
    );
    Ok(PublicationOutcome::Published {
        dataset: dataset.full,
        published: block.files.len(),
        revalidated: plan.to_revalidate.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use catalog::models::{
        BlockSummary, BulkBlock, DatasetRecord, FileRecord, LumiSection, PrimaryDataset,
    };
    use inspect::FileMetadata;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCatalog {
        versions: Vec<&'static str>,
        dataset_files: Vec<FileRecord>,
    }

    #[async_trait]
    impl DatasetCatalog for FakeCatalog {
        async fn list_datasets(&self, query: &DatasetQuery) -> Result<Vec<DatasetRecord>> {
            match query {
                DatasetQuery::Pattern(_) => Ok(self
                    .versions
                    .iter()
                    .map(|name| DatasetRecord {
                        dataset: name.to_string(),
                        data_tier_name: Some("USER".to_string()),
                    })
                    .collect()),
                _ => Ok(vec![]),
            }
        }

        async fn block_summaries(&self, _dataset: &str) -> Result<Vec<BlockSummary>> {
            Ok(vec![])
        }

        async fn list_files(&self, _dataset: &str) -> Result<Vec<FileRecord>> {
            Ok(self.dataset_files.clone())
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        primaries: Mutex<Vec<String>>,
        blocks: Mutex<Vec<BulkBlock>>,
        revalidated: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CatalogWriter for RecordingWriter {
        async fn insert_primary_dataset(&self, primary: &PrimaryDataset) -> Result<()> {
            self.primaries.lock().unwrap().push(primary.primary_ds_name.clone());
            Ok(())
        }

        async fn insert_bulk_block(&self, block: &BulkBlock) -> Result<()> {
            self.blocks.lock().unwrap().push(block.clone());
            Ok(())
        }

        async fn update_file_status(&self, logical_file_name: &str, valid: bool) -> Result<()> {
            assert!(valid);
            self.revalidated
                .lock()
                .unwrap()
                .push(logical_file_name.to_string());
            Ok(())
        }
    }

    struct FixedInspector;

    #[async_trait]
    impl FileInspector for FixedInspector {
        async fn inspect(&self, lfn: &str) -> Result<FileMetadata> {
            if lfn.contains("broken") {
                return Err(Error::Other(format!("Failed to get file size for file {}", lfn)));
            }
            Ok(FileMetadata {
                size: 1000,
                events: 50,
                lumis: vec![LumiSection {
                    run_num: 1,
                    lumi_section_num: 1,
                }],
            })
        }
    }

    fn options(files: &[&str], publish: bool) -> PublishOptions {
        PublishOptions {
            files: files.iter().map(|f| f.to_string()).collect(),
            primary: None,
            dataset: None,
            campaign: "RunIIWinter15pLHE".to_string(),
            info: "MCRUN2-LHE".to_string(),
            tier: "USER".to_string(),
            release: "CMSSW_7_1_14".to_string(),
            origin_site: "T2_CH_CERN".to_string(),
            publish,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn test_publish_new_version() {
        let catalog = FakeCatalog {
            versions: vec![
                "/DM_ttbar01j/RunIIWinter15pLHE-MCRUN2-LHE-v1/USER",
                "/DM_ttbar01j/RunIIWinter15pLHE-MCRUN2-LHE-v2/USER",
            ],
            ..Default::default()
        };
        let writer = RecordingWriter::default();
        let opts = options(
            &[
                "/store/user/x/DM_ttbar01j/a.root",
                "/store/user/x/DM_ttbar01j/b.root",
                "/store/user/x/DM_ttbar01j/readme.txt",
            ],
            true,
        );

        let outcome = run_publication(&catalog, &writer, &FixedInspector, &opts)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PublicationOutcome::Published {
                dataset: "/DM_ttbar01j/RunIIWinter15pLHE-MCRUN2-LHE-v3/USER".to_string(),
                published: 2,
                revalidated: 0,
            }
        );
        assert_eq!(*writer.primaries.lock().unwrap(), vec!["DM_ttbar01j"]);
        let blocks = writer.blocks.lock().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block.file_count, 2);
        assert_eq!(blocks[0].block.block_size, 2000);
        assert!(
            blocks[0]
                .block
                .block_name
                .starts_with("/DM_ttbar01j/RunIIWinter15pLHE-MCRUN2-LHE-v3/USER#")
        );
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let catalog = FakeCatalog::default();
        let writer = RecordingWriter::default();
        let opts = options(&["/store/user/x/DM_ttbar01j/sample.root"], false);

        let outcome = run_publication(&catalog, &writer, &FixedInspector, &opts)
            .await
            .unwrap();

        match outcome {
            PublicationOutcome::DryRun { dataset, plan } => {
                assert_eq!(dataset, "/sample/RunIIWinter15pLHE-MCRUN2-LHE-v1/USER");
                assert_eq!(plan.to_publish.len(), 1);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(writer.primaries.lock().unwrap().is_empty());
        assert!(writer.blocks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revalidation_only_skips_block() {
        let catalog = FakeCatalog {
            dataset_files: vec![FileRecord {
                logical_file_name: "/store/user/x/P/a.root".to_string(),
                is_file_valid: false,
            }],
            ..Default::default()
        };
        let writer = RecordingWriter::default();
        let mut opts = options(&["/store/user/x/P/a.root"], true);
        opts.dataset = Some("/P/Campaign-Info-v4/USER".to_string());

        let outcome = run_publication(&catalog, &writer, &FixedInspector, &opts)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            PublicationOutcome::Published {
                dataset: "/P/Campaign-Info-v4/USER".to_string(),
                published: 0,
                revalidated: 1,
            }
        );
        assert!(writer.blocks.lock().unwrap().is_empty());
        assert_eq!(*writer.revalidated.lock().unwrap(), vec!["/store/user/x/P/a.root"]);
    }

    #[tokio::test]
    async fn test_up_to_date_and_empty_inputs() {
        let catalog = FakeCatalog {
            dataset_files: vec![FileRecord {
                logical_file_name: "/store/user/x/P/a.root".to_string(),
                is_file_valid: true,
            }],
            ..Default::default()
        };
        let writer = RecordingWriter::default();

        let up_to_date = options(&["/store/user/x/P/a.root"], true);
        let outcome = run_publication(&catalog, &writer, &FixedInspector, &up_to_date)
            .await
            .unwrap();
        assert!(matches!(outcome, PublicationOutcome::UpToDate { .. }));

        let nothing = options(&["/store/notes.txt"], true);
        let err = run_publication(&catalog, &writer, &FixedInspector, &nothing)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Nothing to publish"));
    }

    #[tokio::test]
    async fn test_inspection_failure_aborts_before_writing() {
        let catalog = FakeCatalog::default();
        let writer = RecordingWriter::default();
        let opts = options(&["/store/user/x/P/a.root", "/store/user/x/P/broken.root"], true);

        assert!(run_publication(&catalog, &writer, &FixedInspector, &opts).await.is_err());
        assert!(writer.primaries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_dataset_override() {
        let mut opts = options(&["/store/user/x/P/a.root"], false);
        opts.dataset = Some("/P/USER".to_string());
        let err = resolve_dataset_name(&FakeCatalog::default(), "P", &opts).await;
        assert!(matches!(err, Err(Error::InvalidInput(_))));
    }
}
