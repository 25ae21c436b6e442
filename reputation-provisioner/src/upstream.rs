//! Client for the upstream IaaS block-reservation API. `UpstreamClient` is a
//! trait so the Provisioner can be driven against an in-memory fake in
//! tests; `ReqwestUpstreamClient` is the production implementation, built
//! the way `reqwest::Client` is used for outbound HTTP elsewhere in this
//! pack (timeout, bearer auth, JSON body/response).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{config::ProvisionerConfig, error::ProvisionError};

/// A block of IPs reserved from the upstream provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamBlock {
    pub id: String,
    pub ips: Vec<String>,
    pub size: u32,
    pub location: String,
}

#[async_trait]
pub trait UpstreamClient: Send + Sync + std::fmt::Debug {
    /// Reserve a new block of `size` IPs at `location`, named `name`.
    async fn reserve_block(
        &self,
        location: &str,
        size: u32,
        name: &str,
    ) -> Result<UpstreamBlock, ProvisionError>;

    async fn delete_block(&self, block_id: &str) -> Result<(), ProvisionError>;

    async fn list_blocks(&self) -> Result<Vec<UpstreamBlock>, ProvisionError>;
}

/// Production client backed by `reqwest`, grounded in the
/// `reqwest::Client::builder().timeout(...).build()` shape used for other
/// outbound HTTP integrations in this codebase.
#[derive(Debug)]
pub struct ReqwestUpstreamClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl ReqwestUpstreamClient {
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(config: &ProvisionerConfig) -> Result<Self, ProvisionError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProvisionError::Upstream(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            bearer_token: config.bearer_token.clone(),
        })
    }
}

#[derive(Serialize)]
struct ReserveBlockRequest<'a> {
    location: &'a str,
    size: u32,
    name: &'a str,
}

#[async_trait]
impl UpstreamClient for ReqwestUpstreamClient {
    async fn reserve_block(
        &self,
        location: &str,
        size: u32,
        name: &str,
    ) -> Result<UpstreamBlock, ProvisionError> {
        let response = self
            .http
            .post(format!("{}/blocks", self.base_url))
            .bearer_auth(&self.bearer_token)
            .json(&ReserveBlockRequest { location, size, name })
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<UpstreamBlock>().await?)
    }

    async fn delete_block(&self, block_id: &str) -> Result<(), ProvisionError> {
        self.http
            .delete(format!("{}/blocks/{block_id}", self.base_url))
            .bearer_auth(&self.bearer_token)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn list_blocks(&self) -> Result<Vec<UpstreamBlock>, ProvisionError> {
        let response = self
            .http
            .get(format!("{}/blocks", self.base_url))
            .bearer_auth(&self.bearer_token)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<Vec<UpstreamBlock>>().await?)
    }
}
