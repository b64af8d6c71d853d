use crate::http::{ApiClient, endpoint};
use crate::models::{SubscriptionLookup, parse_subscription_response};
use async_trait::async_trait;
use common::Result;

/// Where replica subscriptions of a dataset come from.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn subscriptions(&self, dataset: &str) -> Result<SubscriptionLookup>;
}

pub struct HttpSubscriptionSource {
    api: ApiClient,
    base_url: String,
    service_key: String,
}

impl HttpSubscriptionSource {
    pub fn new(api: ApiClient, base_url: &str, service_key: &str) -> Self {
        Self {
            api,
            base_url: base_url.to_string(),
            service_key: service_key.to_string(),
        }
    }
}

#[async_trait]
impl SubscriptionSource for HttpSubscriptionSource {
    async fn subscriptions(&self, dataset: &str) -> Result<SubscriptionLookup> {
        let url = endpoint(
            &self.base_url,
            "subscriptions",
            &[("dataset", dataset.to_string())],
        )?;
        let body = self.api.get_text(&url).await?;
        parse_subscription_response(&body, &self.service_key)
    }
}
