//! ArcGIS feature service HTTP client.
//!
//! Every request asks for `f=json`, passes through the decode pipeline, and
//! is rejected if the service answered with an error envelope. Transport
//! failures are retried with exponential backoff; nothing else is.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

use super::convert::from_value;
use super::decode::{CoercionRules, combine_url, decode};
use super::error::FeatureServiceError;
use super::types::{FeatureResponse, LayersResponse, QueryResponse, RelatedRecordsResponse};

/// Default map service for WSDOT bridge vertical clearance data.
pub const DEFAULT_SERVICE_ROOT: &str =
    "https://data.wsdot.wa.gov/arcgis/rest/services/Bridge/BridgeVerticalClearance/MapServer";

/// Path of the server extension endpoint that serves document images.
pub const DEFAULT_IMAGE_ENDPOINT: &str = "exts/BridgeVC/image";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// How much of an error response body to keep.
const BODY_EXCERPT_CHARS: usize = 500;

/// Configuration for the feature service client.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Map service root, e.g. `.../MapServer`
    pub service_root: Url,
    /// Path under the root that serves document images
    pub image_endpoint: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
    /// Retries after a transport failure
    pub max_retries: u32,
    /// Delay before the first retry; doubles each time
    pub retry_backoff_ms: u64,
}

impl ServiceConfig {
    /// Create a new config for the given service root.
    pub fn new(service_root: Url) -> Self {
        Self {
            service_root,
            image_endpoint: DEFAULT_IMAGE_ENDPOINT.to_string(),
            timeout_secs: 30,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_retries: 2,
            retry_backoff_ms: 250,
        }
    }

    /// Create a config from a service root string.
    pub fn parse(service_root: &str) -> Result<Self, FeatureServiceError> {
        let root = Url::parse(service_root)
            .map_err(|e| FeatureServiceError::InvalidUrl(format!("{service_root}: {e}")))?;
        Ok(Self::new(root))
    }

    /// Set the image endpoint path.
    pub fn with_image_endpoint(mut self, path: impl Into<String>) -> Self {
        self.image_endpoint = path.into();
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set retry policy for transport failures.
    pub fn with_retries(mut self, max_retries: u32, backoff_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff_ms = backoff_ms;
        self
    }

    /// Config for [`DEFAULT_SERVICE_ROOT`].
    pub fn published() -> Result<Self, FeatureServiceError> {
        Self::parse(DEFAULT_SERVICE_ROOT)
    }

    /// Base URL that document OIDs are resolved against.
    pub fn image_base(&self) -> Result<Url, FeatureServiceError> {
        combine_url(&self.service_root, &[&self.image_endpoint])
            .map_err(|e| FeatureServiceError::InvalidUrl(e.to_string()))
    }
}

/// Feature service client.
///
/// Cheap to clone; clones share the connection pool and request limit.
#[derive(Debug, Clone)]
pub struct FeatureServiceClient {
    http: reqwest::Client,
    service_root: Url,
    rules: Arc<CoercionRules>,
    semaphore: Arc<Semaphore>,
    max_retries: u32,
    retry_backoff: Duration,
}

impl FeatureServiceClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, FeatureServiceError> {
        let rules = CoercionRules::standard(config.image_base()?);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            service_root: config.service_root,
            rules: Arc::new(rules),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// The map service root.
    pub fn service_root(&self) -> &Url {
        &self.service_root
    }

    /// Build `{root}/{parts...}`.
    pub fn endpoint(&self, parts: &[&str]) -> Result<Url, FeatureServiceError> {
        combine_url(&self.service_root, parts)
            .map_err(|e| FeatureServiceError::InvalidUrl(format!("{}: {e}", parts.join("/"))))
    }

    /// Fetch a single feature, `{root}/{layer}/{id}`.
    pub async fn get_feature(
        &self,
        layer: &str,
        id: i64,
    ) -> Result<FeatureResponse, FeatureServiceError> {
        self.get_typed(&[layer, &id.to_string()], &[]).await
    }

    /// Attribute query against a layer or table. Geometry is never requested.
    pub async fn query(
        &self,
        layer: i64,
        where_clause: &str,
        out_fields: &[&str],
    ) -> Result<QueryResponse, FeatureServiceError> {
        self.get_typed(
            &[&layer.to_string(), "query"],
            &[
                ("where", where_clause.to_string()),
                ("outFields", join_fields(out_fields)),
                ("returnGeometry", "false".to_string()),
            ],
        )
        .await
    }

    /// Related records of one origin feature through one relationship.
    pub async fn query_related_records(
        &self,
        layer: i64,
        object_id: i64,
        relationship_id: i64,
        out_fields: &[&str],
    ) -> Result<RelatedRecordsResponse, FeatureServiceError> {
        self.get_typed(
            &[&layer.to_string(), "queryRelatedRecords"],
            &[
                ("objectIds", object_id.to_string()),
                ("relationshipId", relationship_id.to_string()),
                ("outFields", join_fields(out_fields)),
                ("returnGeometry", "false".to_string()),
            ],
        )
        .await
    }

    /// Describe every layer and table in the service.
    pub async fn layers(&self) -> Result<LayersResponse, FeatureServiceError> {
        self.get_typed(&["layers"], &[]).await
    }

    /// GET a path and project the decoded body into `T`.
    pub async fn get_typed<T: DeserializeOwned>(
        &self,
        parts: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, FeatureServiceError> {
        let (url, value) = self.request(parts, query).await?;
        from_value(value).map_err(|source| FeatureServiceError::Conversion {
            url: url.to_string(),
            source,
        })
    }

    /// GET a path and return the decoded, coerced body.
    pub async fn get_json(
        &self,
        parts: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, FeatureServiceError> {
        self.request(parts, query).await.map(|(_, value)| value)
    }

    /// `{root}/{parts...}` with the root's own query (e.g. a token) kept.
    fn request_url(
        &self,
        parts: &[&str],
        query: &[(&str, String)],
    ) -> Result<Url, FeatureServiceError> {
        let mut url = self.endpoint(parts)?;
        url.query_pairs_mut()
            .extend_pairs(self.service_root.query_pairs())
            .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("f", "json");
        Ok(url)
    }

    /// Delay before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    async fn request(
        &self,
        parts: &[&str],
        query: &[(&str, String)],
    ) -> Result<(Url, Value), FeatureServiceError> {
        let url = self.request_url(parts, query)?;

        let mut attempt = 0;
        loop {
            match self.fetch_text(&url).await {
                Ok(body) => {
                    let value = decode(url.as_str(), &body, &self.rules)?;
                    return Ok((url, value));
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(url = %url, attempt, error = %e, "retrying feature service request");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn fetch_text(&self, url: &Url) -> Result<String, FeatureServiceError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FeatureServiceError::Status {
                url: url.to_string(),
                status: 0,
                body: "request limiter closed".to_string(),
            })?;

        debug!(url = %url, "GET");
        let response = self.http.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeatureServiceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body: body.chars().take(BODY_EXCERPT_CHARS).collect(),
            });
        }

        Ok(response.text().await?)
    }
}

fn join_fields(fields: &[&str]) -> String {
    if fields.is_empty() {
        "*".to_string()
    } else {
        fields.join(",")
    }
}
