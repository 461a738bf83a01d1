//! Public entropy for server seeds.
//!
//! A provider returns an externally verifiable value (the latest TRON block id
//! by default). Callers go through [`fetch_server_seed`], which bounds the
//! fetch with a timeout and substitutes a local fallback on any failure, so
//! starting a game never waits on the network for longer than the timeout.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, warn};

use crate::games::SeedOrigin;

/// Prefix of locally generated seeds. Block ids are pure hex and never match.
pub const FALLBACK_PREFIX: &str = "fallback-";

pub const DEFAULT_TRONGRID_ENDPOINT: &str = "https://api.trongrid.io/wallet/getnowblock";

#[derive(Debug, Error)]
pub enum EntropyError {
    #[error("Entropy request failed: {0}")]
    Request(String),

    #[error("Entropy response missing block id")]
    MissingBlockId,

    #[error("Entropy fetch timed out after {0}ms")]
    Timeout(u64),

    #[error("Entropy provider disabled")]
    Disabled,
}

/// Source of a public, externally verifiable seed value
#[async_trait]
pub trait EntropyProvider: Send + Sync {
    /// Fetch the current public value
    async fn fetch(&self) -> Result<String, EntropyError>;

    /// Provider name for logs
    fn name(&self) -> &'static str;
}

/// Server seed plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSeed {
    pub value: String,
    pub origin: SeedOrigin,
}

/// Fetch a server seed, falling back to a local value on timeout or failure.
///
/// Public values get `suffix` appended. Never returns an error.
pub async fn fetch_server_seed(
    provider: &dyn EntropyProvider,
    timeout: Duration,
    suffix: &str,
) -> ServerSeed {
    let result = match tokio::time::timeout(timeout, provider.fetch()).await {
        Ok(result) => result,
        Err(_) => Err(EntropyError::Timeout(timeout.as_millis() as u64)),
    };

    match result {
        Ok(value) if !value.trim().is_empty() => {
            debug!(provider = provider.name(), "Fetched public entropy");
            ServerSeed {
                value: format!("{}{}", value.trim(), suffix),
                origin: SeedOrigin::Public,
            }
        }
        Ok(_) => fallback_seed(provider, EntropyError::MissingBlockId),
        Err(e) => fallback_seed(provider, e),
    }
}

fn fallback_seed(provider: &dyn EntropyProvider, cause: EntropyError) -> ServerSeed {
    match cause {
        EntropyError::Disabled => debug!("Public entropy disabled, using fallback seed"),
        cause => warn!(provider = provider.name(), "Public entropy unavailable, using fallback seed: {}", cause),
    }
    ServerSeed {
        value: fallback_value(),
        origin: SeedOrigin::Fallback,
    }
}

/// `fallback-<unix millis>`
pub fn fallback_value() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("{}{}", FALLBACK_PREFIX, millis)
}

pub fn is_fallback(seed: &str) -> bool {
    seed.starts_with(FALLBACK_PREFIX)
}

#[derive(Debug, Deserialize)]
struct NowBlockResponse {
    #[serde(rename = "blockID")]
    block_id: Option<String>,
}

/// Latest block id from a TronGrid `getnowblock` endpoint
pub struct TronGridProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl TronGridProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, EntropyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EntropyError::Request(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EntropyProvider for TronGridProvider {
    async fn fetch(&self) -> Result<String, EntropyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| EntropyError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| EntropyError::Request(e.to_string()))?;

        let body: NowBlockResponse = response
            .json()
            .await
            .map_err(|e| EntropyError::Request(e.to_string()))?;

        body.block_id
            .filter(|id| !id.is_empty())
            .ok_or(EntropyError::MissingBlockId)
    }

    fn name(&self) -> &'static str {
        "trongrid"
    }
}

/// Fixed value, for tests and offline deployments
pub struct StaticProvider {
    value: String,
}

impl StaticProvider {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

#[async_trait]
impl EntropyProvider for StaticProvider {
    async fn fetch(&self) -> Result<String, EntropyError> {
        Ok(self.value.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Always falls back
pub struct DisabledProvider;

#[async_trait]
impl EntropyProvider for DisabledProvider {
    async fn fetch(&self) -> Result<String, EntropyError> {
        Err(EntropyError::Disabled)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}
