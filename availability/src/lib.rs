pub mod classifier;
pub mod report;
pub mod summary;

use catalog::models::{DatasetQuery, ReplicaRecord, SubscriptionLookup, dataset_size_gb};
use catalog::utils::time::unix_now;
use catalog::{
    ApiClient, DatasetCatalog, HttpCatalog, HttpSubscriptionSource, SubscriptionSource,
    select_datasets,
};
use classifier::{summarize, triage};
use common::config::Settings;
use common::{Error, Result};
use report::{ReportPaths, RunLog, format_replica_line, write_reports};
use std::io::Write;
use std::path::PathBuf;
use summary::RunSummary;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub query: DatasetQuery,
    pub tiers: Vec<String>,
    pub lost_threshold: f64,
    pub grace_days: f64,
    pub custodial_owner_group: String,
    pub report_dir: PathBuf,
}

/// Runs the consistency check against the configured services and writes
/// the report files. Fails only when the run as a whole could not be done.
pub async fn run_availability_check(
    settings: &Settings,
    options: &CheckOptions,
) -> Result<RunSummary> {
    let api = ApiClient::new(settings)?;
    let catalog = HttpCatalog::reader(api.clone(), &settings.catalog.reader_url);
    let subscriptions = HttpSubscriptionSource::new(
        api,
        &settings.transfer.url,
        &settings.transfer.service_key,
    );

    std::fs::create_dir_all(&options.report_dir)?;
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let paths = ReportPaths::new(
        &options.report_dir,
        &options.query.period(),
        &date,
        &options.tiers,
    );
    let mut log = RunLog::create(&paths.log())?;
    info!(log = %paths.log().display(), "Writing run log");

    let summary = check_datasets(&catalog, &subscriptions, options, unix_now(), &mut log).await?;
    log.finish()?;

    write_reports(&summary, &paths, options.lost_threshold)?;
    println!("For details see produced files");

    if summary.all_failed() {
        return Err(Error::Other(format!(
            "all {} subscription lookups failed",
            summary.checked
        )));
    }
    Ok(summary)
}

/// Checks every selected dataset in catalog order. A failing lookup is
/// recorded against its dataset and the loop moves on.
pub async fn check_datasets<W: Write>(
    catalog: &dyn DatasetCatalog,
    subscriptions: &dyn SubscriptionSource,
    options: &CheckOptions,
    now: f64,
    log: &mut RunLog<W>,
) -> Result<RunSummary> {
    let datasets = select_datasets(catalog, &options.query, &options.tiers).await?;
    log.line(&format!("Number of datasets to check: {}", datasets.len()))?;
    println!("Number of datasets to check: {}", datasets.len());

    let mut summary = RunSummary::default();
    for record in &datasets {
        let dataset = record.dataset.as_str();
        log.line(&format!("\nDataset: {}", dataset))?;

        match catalog.block_summaries(dataset).await {
            Ok(blocks) => match dataset_size_gb(dataset, &blocks) {
                Ok(size) => log.line(&format!(" \t {:.0} GB", size))?,
                Err(e) => warn!(dataset, error = %e, "Dataset size unknown"),
            },
            Err(e) => warn!(dataset, error = %e, "Failed to fetch block summaries"),
        }

        let replicas: Vec<ReplicaRecord> = match subscriptions.subscriptions(dataset).await {
            Ok(SubscriptionLookup::Found(replicas)) => replicas,
            Ok(SubscriptionLookup::NotFound) => {
                log.line("No information in the transfer service about this dataset")?;
                Vec::new()
            }
            Err(e) => {
                warn!(dataset, error = %e, "Skipping dataset");
                log.line(&format!("Failed to fetch subscriptions: {}", e))?;
                summary.record_failure(dataset);
                continue;
            }
        };

        for replica in &replicas {
            log.line(&format_replica_line(replica))?;
        }

        let report = summarize(&replicas, options.lost_threshold, &options.custodial_owner_group);
        let flags = triage(&report, options.grace_days, now);
        if flags.is_empty() {
            log.line("Skip the dataset availability check since the first subscription is very recent")?;
        }
        info!(
            dataset,
            ?flags,
            complete = report.complete_count,
            incomplete = report.incomplete_count,
            "Checked dataset"
        );
        summary.record(dataset, &flags);
    }

    Ok(summary)
}
