use adosync_core::Entity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::{build_http_client, AuthError, CatalogError, CatalogSink, FetchError, HttpClientConfig};

#[derive(Clone)]
pub struct PortConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub http: HttpClientConfig,
}

impl std::fmt::Debug for PortConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlueprintSummary {
    pub identifier: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlueprintList {
    #[serde(default)]
    blueprints: Vec<BlueprintSummary>,
}

/// Port API session. Holds the bearer token once [`CatalogSink::authenticate`]
/// succeeds; the token is never refreshed.
pub struct PortClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for PortClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortClient")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl PortClient {
    pub fn new(config: PortConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(&config.http)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id,
            client_secret: config.client_secret,
            access_token: None,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn token(&self) -> Result<&str, CatalogError> {
        self.access_token
            .as_deref()
            .ok_or(CatalogError::NotAuthenticated)
    }

    pub async fn list_blueprints(&self) -> Result<Vec<BlueprintSummary>, CatalogError> {
        let token = self.token()?;
        let url = format!("{}/blueprints", self.base_url);
        let resp = self.client.get(&url).bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }
        let list: BlueprintList = resp.json().await?;
        Ok(list.blueprints)
    }
}

#[async_trait]
impl CatalogSink for PortClient {
    async fn authenticate(&mut self) -> Result<(), AuthError> {
        let url = format!("{}/auth/access_token", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthError::HttpStatus(status.as_u16()));
        }

        let body: TokenResponse = resp.json().await?;
        match body.access_token.filter(|token| !token.is_empty()) {
            Some(token) => {
                self.access_token = Some(token);
                Ok(())
            }
            None => Err(AuthError::MissingToken),
        }
    }

    async fn upsert(&self, blueprint: &str, entity: &Entity) -> Result<JsonValue, CatalogError> {
        let token = self.token()?;
        let url = format!("{}/blueprints/{}/entities", self.base_url, blueprint);
        debug!(blueprint, identifier = %entity.identifier, "posting entity");

        let resp = self
            .client
            .post(&url)
            .query(&[("upsert", "true")])
            .bearer_auth(token)
            .json(entity)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(resp.json::<JsonValue>().await?)
    }
}
