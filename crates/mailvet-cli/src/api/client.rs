//! HTTP API client for the verification service
//!
//! Snapshot, listing and statistics calls carry a per-request timeout.
//! The streaming batch submission does not: a stalled producer stalls the
//! stream until the transport gives up or the caller cancels.

use crate::api::{endpoints, types::*};
use crate::config::Config;
use crate::error::{CliError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use mailvet_common::ExportCategory;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Connect timeout shared by every request, streaming included.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Raw body chunks of a streaming response
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// Source of batch status snapshots (dependency injection seam)
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetch a point-in-time status snapshot of one batch
    async fn fetch_status(&self, job_id: &str) -> Result<StatusSnapshot>;
}

/// API client for the verification service
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    request_timeout: Duration,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    /// Create from CLI configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.server_url(), config.request_timeout)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the statistics endpoint answers
    pub async fn health_check(&self) -> Result<bool> {
        let url = endpoints::category_stats_url(&self.base_url);

        match self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// Verify a single address
    pub async fn verify_email(&self, email: &str) -> Result<EmailResult> {
        let url = endpoints::verify_email_url(&self.base_url);
        let request = SingleVerifyRequest {
            email: email.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        Ok(ensure_success(response).await?.json().await?)
    }

    /// Submit a batch and return the open newline-delimited event stream
    ///
    /// Resolves once response headers arrive; the body is consumed lazily
    /// through the returned stream.
    pub async fn submit_batch(&self, emails: &[String]) -> Result<ChunkStream> {
        let url = endpoints::verify_batch_url(&self.base_url);
        let request = BatchRequest {
            emails: emails.to_vec(),
        };

        debug!(url = %url, count = emails.len(), "Submitting batch");
        let response = self.client.post(&url).json(&request).send().await?;
        let response = ensure_success(response).await?;

        Ok(response.bytes_stream().map_err(CliError::from).boxed())
    }

    /// List every batch identifier known to the service
    pub async fn list_batches(&self) -> Result<BatchListResponse> {
        self.get_json(&endpoints::batches_url(&self.base_url)).await
    }

    /// Full per-email results of one batch
    pub async fn batch_details(&self, batch_id: &str) -> Result<BatchDetails> {
        self.get_json(&endpoints::batch_results_url(&self.base_url, batch_id))
            .await
    }

    /// Download the export of one batch
    pub async fn export_batch(&self, batch_id: &str, category: ExportCategory) -> Result<Vec<u8>> {
        let url = endpoints::export_url(&self.base_url, batch_id, category);

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        Ok(ensure_success(response).await?.bytes().await?.to_vec())
    }

    /// Lifetime statistics by category
    pub async fn category_stats(&self) -> Result<CategoryStats> {
        self.get_json(&endpoints::category_stats_url(&self.base_url))
            .await
    }
}

#[async_trait]
impl StatusSource for ApiClient {
    async fn fetch_status(&self, job_id: &str) -> Result<StatusSnapshot> {
        self.get_json(&endpoints::status_url(&self.base_url, job_id))
            .await
    }
}

/// Turn a non-2xx response into an API error carrying status and body
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let detail = body.trim();
    Err(CliError::api(if detail.is_empty() {
        format!("{} returned {}", url, status)
    } else {
        format!("{} returned {}: {}", url, status, detail)
    }))
}
