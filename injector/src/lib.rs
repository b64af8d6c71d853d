pub mod command;

pub use command::CommandInjector;

use async_trait::async_trait;
use catalog::models::{DatasetQuery, dataset_size_gb};
use catalog::{DatasetCatalog, select_datasets};
use common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// One replication request for a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionRequest {
    pub dataset: String,
    pub copies: u32,
    pub size_gb: f64,
    /// Without it the injector only reports what it would subscribe.
    pub execute: bool,
}

impl InjectionRequest {
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--dataset={}", self.dataset),
            format!("--nCopies={}", self.copies),
            format!("--expectedSizeGb={}", self.size_gb.trunc() as u64),
        ];
        if self.execute {
            args.push("--exec".to_string());
        }
        args
    }
}

/// Issues replication requests. Returns the exit code of the request.
#[async_trait]
pub trait ReplicaInjector: Send + Sync {
    async fn inject_replicas(&self, request: &InjectionRequest) -> Result<i32>;
}

#[derive(Debug, Clone)]
pub enum DatasetSource {
    Catalog {
        query: DatasetQuery,
        tiers: Vec<String>,
    },
    /// A list file written by the availability check.
    ListFile(PathBuf),
}

#[derive(Debug, Clone)]
pub struct InjectOptions {
    pub source: DatasetSource,
    pub copies: u32,
    pub execute: bool,
    pub retry_delay: Duration,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InjectionSummary {
    pub injected: Vec<String>,
    pub skipped: Vec<String>,
}

/// Reads one dataset name per line, ignoring blank lines.
pub fn read_dataset_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Runs the request, and once more after `retry_delay` if it fails.
pub async fn inject_with_retry(
    injector: &dyn ReplicaInjector,
    request: &InjectionRequest,
    retry_delay: Duration,
) -> Result<()> {
    let mut attempt = 1;
    loop {
        let failure = match injector.inject_replicas(request).await {
            Ok(0) => return Ok(()),
            Ok(code) => Error::CommandFailed {
                command: format!("inject {}", request.args().join(" ")),
                code,
            },
            Err(e) => e,
        };

        if attempt == 2 {
            return Err(failure);
        }
        warn!(
            dataset = %request.dataset,
            error = %failure,
            delay_secs = retry_delay.as_secs(),
            "Injection failed, retrying"
        );
        tokio::time::sleep(retry_delay).await;
        attempt += 1;
    }
}

/// Requests replicas for every dataset of the source. A dataset whose size
/// cannot be determined is skipped; a request that fails twice aborts the run.
pub async fn run_injection(
    catalog: &dyn DatasetCatalog,
    injector: &dyn ReplicaInjector,
    options: &InjectOptions,
) -> Result<InjectionSummary> {
    let datasets: Vec<String> = match &options.source {
        DatasetSource::Catalog { query, tiers } => select_datasets(catalog, query, tiers)
            .await?
            .into_iter()
            .map(|record| record.dataset)
            .collect(),
        DatasetSource::ListFile(path) => read_dataset_list(path)?,
    };
    println!("Total number of datasets to inject: {}", datasets.len());

    let mut summary = InjectionSummary::default();
    for dataset in datasets {
        let size_gb = match catalog
            .block_summaries(&dataset)
            .await
            .and_then(|blocks| dataset_size_gb(&dataset, &blocks))
        {
            Ok(size) => size,
            Err(e) => {
                warn!(dataset = %dataset, error = %e, "Skipping dataset without size");
                summary.skipped.push(dataset);
                continue;
            }
        };
        println!("\nDataset: {} \t {:.0} GB", dataset, size_gb);

        let request = InjectionRequest {
            dataset,
            copies: options.copies,
            size_gb,
            execute: options.execute,
        };
        info!(args = ?request.args(), "Requesting replicas");
        inject_with_retry(injector, &request, options.retry_delay).await?;
        summary.injected.push(request.dataset);
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::models::{BlockSummary, DatasetRecord, FileRecord};
    use std::io::Write;
    use std::sync::Mutex;

    struct FakeCatalog;

    #[async_trait]
    impl DatasetCatalog for FakeCatalog {
        async fn list_datasets(&self, _query: &DatasetQuery) -> Result<Vec<DatasetRecord>> {
            Ok(vec![
                DatasetRecord {
                    dataset: "/ZeroBias/Run2015C-v1/RAW".to_string(),
                    data_tier_name: Some("RAW".to_string()),
                },
                DatasetRecord {
                    dataset: "/ZeroBias/Run2015C-PromptReco-v1/AOD".to_string(),
                    data_tier_name: Some("AOD".to_string()),
                },
                DatasetRecord {
                    dataset: "/Empty/Run2015C-v1/RAW".to_string(),
                    data_tier_name: Some("RAW".to_string()),
                },
            ])
        }

        async fn block_summaries(&self, dataset: &str) -> Result<Vec<BlockSummary>> {
            if dataset.starts_with("/Empty/") {
                return Ok(vec![]);
            }
            Ok(vec![BlockSummary {
                file_size: 2_684_354_560,
                num_file: Some(3),
                num_event: Some(1000),
            }])
        }

        async fn list_files(&self, _dataset: &str) -> Result<Vec<FileRecord>> {
            Ok(vec![])
        }
    }

    /// Replays scripted exit codes and records every request.
    struct ScriptedInjector {
        codes: Mutex<Vec<i32>>,
        requests: Mutex<Vec<InjectionRequest>>,
    }

    impl ScriptedInjector {
        fn new(codes: Vec<i32>) -> Self {
            Self {
                codes: Mutex::new(codes),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReplicaInjector for ScriptedInjector {
        async fn inject_replicas(&self, request: &InjectionRequest) -> Result<i32> {
            self.requests.lock().unwrap().push(request.clone());
            let mut codes = self.codes.lock().unwrap();
            Ok(if codes.is_empty() { 0 } else { codes.remove(0) })
        }
    }

    fn options(source: DatasetSource) -> InjectOptions {
        InjectOptions {
            source,
            copies: 4,
            execute: false,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_request_args() {
        let mut request = InjectionRequest {
            dataset: "/ZeroBias/Run2015C-v1/RAW".to_string(),
            copies: 4,
            size_gb: 2.5,
            execute: false,
        };
        assert_eq!(
            request.args(),
            vec![
                "--dataset=/ZeroBias/Run2015C-v1/RAW",
                "--nCopies=4",
                "--expectedSizeGb=2",
            ]
        );

        request.execute = true;
        assert_eq!(request.args().last().map(String::as_str), Some("--exec"));
    }

    #[tokio::test]
    async fn test_run_injection_from_catalog() {
        let injector = ScriptedInjector::new(vec![]);
        let summary = run_injection(
            &FakeCatalog,
            &injector,
            &options(DatasetSource::Catalog {
                query: DatasetQuery::Run(254833),
                tiers: vec!["RAW".to_string()],
            }),
        )
        .await
        .unwrap();

        assert_eq!(summary.injected, vec!["/ZeroBias/Run2015C-v1/RAW"]);
        assert_eq!(summary.skipped, vec!["/Empty/Run2015C-v1/RAW"]);

        let requests = injector.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].copies, 4);
        assert_eq!(requests[0].size_gb, 2.5);
    }

    #[tokio::test]
    async fn test_run_injection_from_list_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "/A/Run2015C-v1/RAW\n\n  /B/Run2015C-v1/AOD  ").unwrap();

        let injector = ScriptedInjector::new(vec![]);
        let summary = run_injection(
            &FakeCatalog,
            &injector,
            &options(DatasetSource::ListFile(file.path().to_path_buf())),
        )
        .await
        .unwrap();

        assert_eq!(summary.injected, vec!["/A/Run2015C-v1/RAW", "/B/Run2015C-v1/AOD"]);
    }

    #[tokio::test]
    async fn test_failed_request_is_retried_once() {
        let injector = ScriptedInjector::new(vec![1, 0]);
        let request = InjectionRequest {
            dataset: "/A/B/RAW".to_string(),
            copies: 1,
            size_gb: 1.0,
            execute: true,
        };

        inject_with_retry(&injector, &request, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(injector.requests.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_second_failure_aborts_run() {
        let injector = ScriptedInjector::new(vec![2, 3]);
        let result = run_injection(
            &FakeCatalog,
            &injector,
            &options(DatasetSource::Catalog {
                query: DatasetQuery::Run(254833),
                tiers: vec![],
            }),
        )
        .await;

        assert!(matches!(result, Err(Error::CommandFailed { code: 3, .. })));
        assert_eq!(injector.requests.lock().unwrap().len(), 2);
    }
}
