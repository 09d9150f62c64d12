//! Vultr API v2 client.
//!
//! - Base URL: `https://api.vultr.com/v2` (overridable via `VULTR_API_BASE`)
//! - Authentication: `Authorization: Bearer <api key>`

use std::sync::Arc;

use async_trait::async_trait;
use ktomg_core::InstanceId;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::VultrConfig;

use super::InstanceDirectory;
use super::error::VultrError;
use super::types::{InstanceRecord, ListInstancesResponse};

/// Page size requested from `GET /instances` (the API maximum is 500).
const PAGE_SIZE: u32 = 100;

/// Upper bound on followed cursors, in case the upstream loops.
const MAX_PAGES: usize = 100;

/// Vultr API client.
#[derive(Clone)]
pub struct VultrClient {
    inner: Arc<VultrClientInner>,
}

struct VultrClientInner {
    client: reqwest::Client,
    api_base: String,
}

impl VultrClient {
    /// Create a new Vultr API client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &VultrConfig) -> Result<Self, VultrError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_key.expose_secret());
        let mut auth = HeaderValue::from_str(&auth_value)
            .map_err(|e| VultrError::Config(format!("Invalid API key format: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| VultrError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(VultrClientInner {
                client,
                api_base: config.api_base.trim_end_matches('/').to_string(),
            }),
        })
    }

    /// Build an endpoint URL under the API base.
    fn endpoint(&self, path: &str) -> Result<Url, VultrError> {
        Url::parse(&format!("{}{path}", self.inner.api_base))
            .map_err(|e| VultrError::Config(format!("Invalid API URL: {e}")))
    }

    /// Fetch one page of instances.
    async fn list_page(&self, cursor: Option<&str>) -> Result<ListInstancesResponse, VultrError> {
        let mut url = self.endpoint("/instances")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("per_page", &PAGE_SIZE.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }

        let response = self
            .inner
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| VultrError::UpstreamUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VultrError::UpstreamUnavailable(format!("{status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VultrError::UpstreamUnavailable(e.to_string()))?;

        serde_json::from_str(&body)
            .map_err(|e| VultrError::UpstreamMalformed(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl InstanceDirectory for VultrClient {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<InstanceRecord>, VultrError> {
        let mut instances = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let page = self.list_page(cursor.as_deref()).await?;

            let batch = page.instances.ok_or_else(|| {
                VultrError::UpstreamMalformed("response has no instances collection".to_string())
            })?;
            instances.extend(batch);

            let next = page.meta.map(|meta| meta.links.next).unwrap_or_default();
            if next.is_empty() {
                debug!(count = instances.len(), "Listed Vultr instances");
                return Ok(instances);
            }
            cursor = Some(next);
        }

        warn!(
            count = instances.len(),
            max_pages = MAX_PAGES,
            "Stopped following Vultr pagination cursors"
        );
        Ok(instances)
    }

    #[instrument(skip(self), fields(instance_id = %instance_id))]
    async fn reboot(&self, instance_id: &InstanceId) -> Result<(), VultrError> {
        let path = format!(
            "/instances/{}/reboot",
            urlencoding::encode(instance_id.as_str())
        );
        let url = self.endpoint(&path)?;

        let response = self
            .inner
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| VultrError::RebootFailed {
                instance_id: instance_id.clone(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VultrError::RebootFailed {
                instance_id: instance_id.clone(),
                cause: format!("{status}: {body}"),
            });
        }

        info!("Vultr instance reboot accepted");
        Ok(())
    }
}

impl std::fmt::Debug for VultrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VultrClient")
            .field("api_base", &self.inner.api_base)
            .finish_non_exhaustive()
    }
}
