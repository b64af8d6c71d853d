use config::{Config, ConfigError};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub publication: PublicationConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default = "default_api_config")]
    pub api: ApiConfig,
    #[serde(default)]
    pub availability: AvailabilityConfig,
    #[serde(default)]
    pub injector: InjectorConfig,
}

/// Read-only bookkeeping instance holding the production datasets.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_reader_url")]
    pub reader_url: String,
}

/// Bookkeeping instance that user datasets are published into.
#[derive(Debug, Deserialize, Clone)]
pub struct PublicationConfig {
    #[serde(default = "default_publication_reader_url")]
    pub reader_url: String,
    #[serde(default = "default_publication_writer_url")]
    pub writer_url: String,
    #[serde(default = "default_campaign")]
    pub campaign: String,
    #[serde(default = "default_info")]
    pub info: String,
    #[serde(default = "default_tier")]
    pub tier: String,
    #[serde(default = "default_origin_site")]
    pub origin_site: String,
    #[serde(default = "default_release")]
    pub release: String,
    #[serde(default = "default_xrootd_redirector")]
    pub xrootd_redirector: String,
    #[serde(default = "default_stat_command")]
    pub stat_command: String,
    #[serde(default = "default_inspect_command")]
    pub inspect_command: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TransferConfig {
    #[serde(default = "default_transfer_url")]
    pub url: String,
    /// Top-level key wrapping every data service response.
    #[serde(default = "default_service_key")]
    pub service_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AvailabilityConfig {
    #[serde(default = "default_lost_threshold")]
    pub lost_threshold: f64,
    #[serde(default = "default_grace_days")]
    pub grace_days: f64,
    #[serde(default = "default_custodial_owner_group")]
    pub custodial_owner_group: String,
    #[serde(default = "default_report_dir")]
    pub report_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InjectorConfig {
    #[serde(default = "default_injector_path")]
    pub path: String,
    #[serde(default = "default_copies")]
    pub copies: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_api_config() -> ApiConfig {
    ApiConfig {
        headers: HashMap::new(),
    }
}

fn default_catalog_reader_url() -> String {
    "https://cmsweb.cern.ch/dbs/prod/global/DBSReader".to_string()
}

fn default_publication_reader_url() -> String {
    "https://cmsweb.cern.ch/dbs/prod/phys03/DBSReader".to_string()
}

fn default_publication_writer_url() -> String {
    "https://cmsweb.cern.ch/dbs/prod/phys03/DBSWriter".to_string()
}

fn default_campaign() -> String {
    "RunIIWinter15pLHE".to_string()
}

fn default_info() -> String {
    "MCRUN2-LHE".to_string()
}

fn default_tier() -> String {
    "USER".to_string()
}

fn default_origin_site() -> String {
    "T2_CH_CERN".to_string()
}

fn default_release() -> String {
    std::env::var("CMSSW_VERSION").unwrap_or_default()
}

fn default_xrootd_redirector() -> String {
    "cms-xrd-global.cern.ch".to_string()
}

fn default_stat_command() -> String {
    "xrd".to_string()
}

fn default_inspect_command() -> String {
    "edm-file-summary".to_string()
}

fn default_transfer_url() -> String {
    "https://cmsweb.cern.ch/phedex/datasvc/json/prod".to_string()
}

fn default_service_key() -> String {
    "phedex".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_retries() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_lost_threshold() -> f64 {
    90.0
}

fn default_grace_days() -> f64 {
    7.0
}

fn default_custodial_owner_group() -> String {
    "AnalysisOps".to_string()
}

fn default_report_dir() -> String {
    "reports".to_string()
}

fn default_injector_path() -> String {
    "assignDatasetToSite.py".to_string()
}

fn default_copies() -> u32 {
    4
}

fn default_retry_delay_secs() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            reader_url: default_catalog_reader_url(),
        }
    }
}

impl Default for PublicationConfig {
    fn default() -> Self {
        Self {
            reader_url: default_publication_reader_url(),
            writer_url: default_publication_writer_url(),
            campaign: default_campaign(),
            info: default_info(),
            tier: default_tier(),
            origin_site: default_origin_site(),
            release: default_release(),
            xrootd_redirector: default_xrootd_redirector(),
            stat_command: default_stat_command(),
            inspect_command: default_inspect_command(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            url: default_transfer_url(),
            service_key: default_service_key(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        default_api_config()
    }
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            lost_threshold: default_lost_threshold(),
            grace_days: default_grace_days(),
            custodial_owner_group: default_custodial_owner_group(),
            report_dir: default_report_dir(),
        }
    }
}

impl Default for InjectorConfig {
    fn default() -> Self {
        Self {
            path: default_injector_path(),
            copies: default_copies(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (optional) overlaid with `DDM_*` environment
    /// variables, e.g. `DDM_AVAILABILITY__LOST_THRESHOLD=80`.
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("DDM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        // Build the configuration
        let config = builder.build()?;

        if let Ok(headers) = config.get_table("api.headers") {
            debug!(count = headers.len(), "Loaded API headers from configuration");
        }

        let settings: Settings = config.try_deserialize()?;

        debug!(
            catalog = %settings.catalog.reader_url,
            transfer = %settings.transfer.url,
            "Parsed settings"
        );

        Ok(settings)
    }
}
