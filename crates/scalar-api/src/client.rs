//! HTTP client for the Scalar API

use std::time::Duration;

use async_trait::async_trait;
use scalar_core::{Protocol, UpstreamError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::dto::{CrossChainTx, ListParams, Paged, QueryEnvelope, StatParams, StatPoint};
use crate::poller::ResourceFetcher;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

type Result<T> = std::result::Result<T, UpstreamError>;

#[derive(Clone)]
pub struct ScalarClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ScalarClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .user_agent("scalar-bridge")
            .build()
            .map_err(|e| UpstreamError::Unreachable {
                url: base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Run a query through the `POST /api/x` envelope
    pub async fn query<P, T>(&self, method: &str, params: P) -> Result<T>
    where
        P: Serialize + Send,
        T: DeserializeOwned,
    {
        let url = self.url("api/x");
        let envelope = QueryEnvelope::new(method, params);
        let response = self.timed(&url, self.http.post(&url).json(&envelope).send()).await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(method, status = status.as_u16(), "Scalar query failed");
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::Parse(format!("{}: {}", method, e)))
    }

    pub async fn protocols(&self, params: ListParams) -> Result<Paged<Protocol>> {
        self.query("searchProtocols", params).await
    }

    /// Protocol by its tag, if the API lists it
    pub async fn protocol(&self, tag: &str) -> Result<Option<Protocol>> {
        let page: Paged<Protocol> = self
            .query("searchProtocols", serde_json::json!({ "tag": tag, "size": 1, "offset": 0 }))
            .await?;
        Ok(page.data.into_iter().find(|p| p.tag == tag))
    }

    pub async fn cross_chain_transactions(&self, params: ListParams) -> Result<Paged<CrossChainTx>> {
        self.query("searchCrossChainTxs", params).await
    }

    pub async fn statistics(&self, params: StatParams) -> Result<Vec<StatPoint>> {
        self.query("getStatistics", params).await
    }

    /// `GET` a resource body. Non-OK responses and empty bodies are `None`.
    pub async fn get_resource(&self, path: &str) -> Result<Option<String>> {
        let url = self.url(path);
        let response = self.timed(&url, self.http.get(&url).send()).await?;

        if !response.status().is_success() {
            tracing::debug!(url = %url, status = response.status().as_u16(), "Resource not ready");
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Parse(format!("{}: {}", url, e)))?;
        Ok(if body.trim().is_empty() { None } else { Some(body) })
    }

    /// Fetcher for `GET /api/{kind}/{id}`
    pub fn resource(&self, kind: &str) -> ScalarResource {
        ScalarResource {
            client: self.clone(),
            prefix: format!("api/{}", kind.trim_matches('/')),
        }
    }

    async fn timed<T>(
        &self,
        url: &str,
        fut: impl std::future::Future<Output = std::result::Result<T, reqwest::Error>>,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| UpstreamError::Unreachable {
                url: url.to_string(),
                message: format!("request timed out after {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| UpstreamError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}

/// One resource family of the Scalar API, addressable by id
#[derive(Clone)]
pub struct ScalarResource {
    client: ScalarClient,
    prefix: String,
}

impl ScalarResource {
    pub fn path(&self, id: &str) -> String {
        format!("{}/{}", self.prefix, id)
    }
}

#[async_trait]
impl ResourceFetcher for ScalarResource {
    async fn fetch(&self, id: &str) -> Result<Option<String>> {
        self.client.get_resource(&self.path(id)).await
    }
}
