//! HTTP clients for the Azure DevOps source and the Port catalog destination.
//!
//! Both sides sit behind a trait so the sync pipeline can be driven by fakes.
//! No client retries: source fetch failures degrade to empty lists, catalog
//! failures are returned to the caller.

use std::time::Duration;

use adosync_core::{Entity, Project};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

mod azure_devops;
mod port;

pub use azure_devops::{AzureDevOpsClient, AzureDevOpsConfig};
pub use port::{BlueprintSummary, PortClient, PortConfig};

pub const CRATE_NAME: &str = "adosync-clients";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: REQUEST_TIMEOUT,
            user_agent: None,
        }
    }
}

pub(crate) fn build_http_client(config: &HttpClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder()
        .gzip(true)
        .brotli(true)
        .timeout(config.timeout);

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    builder.build()
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("decoding response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid url {0}")]
    Url(String),
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("token endpoint returned http status {0}")]
    HttpStatus(u16),
    #[error("token response carried no accessToken")]
    MissingToken,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no access token; authenticate first")]
    NotAuthenticated,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
}

/// Read side of the sync. Every listing degrades to an empty `Vec` on failure.
#[async_trait]
pub trait SourceApi: Send + Sync {
    async fn list_projects(&self) -> Vec<Project>;

    async fn list_recent_builds(&self, project: &str, window_days: i64) -> Vec<JsonValue>;

    /// A 404 and a failed fetch both produce an empty list.
    async fn list_test_runs(&self, project: &str, build_id: &str) -> Vec<JsonValue>;

    async fn list_test_results(&self, project: &str, run_id: &str) -> Vec<JsonValue>;

    async fn list_coverage(&self, project: &str, build_id: &str) -> Vec<JsonValue>;
}

/// Write side of the sync: an authenticated session that upserts entities.
#[async_trait]
pub trait CatalogSink: Send + Sync {
    async fn authenticate(&mut self) -> Result<(), AuthError>;

    async fn upsert(&self, blueprint: &str, entity: &Entity) -> Result<JsonValue, CatalogError>;
}
