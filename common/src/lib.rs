use thiserror::Error;
use url::ParseError;

pub mod config;
pub mod logging;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Forbidden - Access denied")]
    Forbidden,

    #[error("Gateway timeout")]
    GatewayTimeout,

    #[error("HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Maximum retries exceeded")]
    MaxRetriesExceeded,

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Malformed catalog response: {0}")]
    MalformedCatalogResponse(String),

    #[error("Command `{command}` failed with exit code {code}")]
    CommandFailed { command: String, code: i32 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid Uri: {0}")]
    InvalidUri(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Transport-level failures worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimit | Error::GatewayTimeout => true,
            Error::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::InvalidUri(format!("URL parse error: {}", err))
    }
}
