use crate::utils::retry::retry_with_backoff;
use common::config::Settings;
use common::{Error, Result};
use reqwest::{Client, RequestBuilder};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Thin wrapper over the HTTP client that applies configured headers,
/// status mapping and retries to every call.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    headers: HashMap<String, String>,
    retries: u32,
    base_delay_ms: u64,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.http.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            headers: settings.api.headers.clone(),
            retries: settings.http.retries,
            base_delay_ms: settings.http.base_delay_ms,
        })
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<String> {
        let request = self
            .headers
            .iter()
            .fold(request, |request, (name, value)| request.header(name, value));
        let response = request.send().await?;
        check_status(response.status().as_u16(), url)?;
        Ok(response.text().await?)
    }

    pub async fn get_text(&self, url: &Url) -> Result<String> {
        retry_with_backoff(self.retries, self.base_delay_ms, move || async move {
            debug!(%url, "GET");
            self.send(self.client.get(url.as_str()), url).await
        })
        .await
    }

    /// POSTs a JSON body. Not retried: writes are not idempotent.
    pub async fn post_json(&self, url: &Url, body: &serde_json::Value) -> Result<String> {
        debug!(%url, "POST");
        self.send(self.client.post(url.as_str()).json(body), url).await
    }

    pub async fn put(&self, url: &Url) -> Result<String> {
        debug!(%url, "PUT");
        self.send(self.client.put(url.as_str()), url).await
    }
}

/// Joins `path` onto `base` and appends the query parameters.
pub fn endpoint(base: &str, path: &str, params: &[(&str, String)]) -> Result<Url> {
    let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
    Ok(Url::parse_with_params(&raw, params)?)
}

pub fn check_status(status: u16, url: &Url) -> Result<()> {
    match status {
        200..=299 => Ok(()),
        401 | 403 => Err(Error::Forbidden),
        429 => Err(Error::RateLimit),
        504 => Err(Error::GatewayTimeout),
        status => Err(Error::HttpStatus {
            status,
            url: url.to_string(),
        }),
    }
}
