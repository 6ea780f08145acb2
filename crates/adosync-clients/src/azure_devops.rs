use adosync_core::{build_uri, min_time_filter, Project};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::{build_http_client, FetchError, HttpClientConfig, SourceApi};

const PROJECTS_API_VERSION: &str = "7.1-preview.4";
const BUILDS_API_VERSION: &str = "7.1-preview.7";
const TEST_API_VERSION: &str = "7.0";

#[derive(Clone)]
pub struct AzureDevOpsConfig {
    pub base_url: String,
    pub organization: String,
    pub personal_access_token: String,
    pub http: HttpClientConfig,
}

impl std::fmt::Debug for AzureDevOpsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOpsConfig")
            .field("base_url", &self.base_url)
            .field("organization", &self.organization)
            .field("http", &self.http)
            .finish_non_exhaustive()
    }
}

/// Basic-auth client scoped to one Azure DevOps organization.
pub struct AzureDevOpsClient {
    client: reqwest::Client,
    organization: String,
    org_url: Url,
    personal_access_token: String,
}

impl std::fmt::Debug for AzureDevOpsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureDevOpsClient")
            .field("org_url", &self.org_url.as_str())
            .finish_non_exhaustive()
    }
}

impl AzureDevOpsClient {
    pub fn new(config: AzureDevOpsConfig) -> Result<Self, FetchError> {
        let mut org_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|err| FetchError::Url(format!("{}: {err}", config.base_url)))?;
        org_url
            .path_segments_mut()
            .map_err(|_| FetchError::Url(config.base_url.clone()))?
            .pop_if_empty()
            .push(&config.organization);

        Ok(Self {
            client: build_http_client(&config.http)?,
            organization: config.organization,
            org_url,
            personal_access_token: config.personal_access_token,
        })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = self.org_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Url(self.org_url.to_string()))?
            .extend(segments);
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<JsonValue, FetchError> {
        let resp = self
            .client
            .get(url)
            .basic_auth("", Some(&self.personal_access_token))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                url: resp.url().to_string(),
            });
        }
        Ok(resp.json::<JsonValue>().await?)
    }

    async fn get_list(&self, url: Url) -> Result<Vec<JsonValue>, FetchError> {
        let mut body = self.get_json(url).await?;
        Ok(take_array(&mut body, "value"))
    }

    async fn fetch_projects(&self) -> Result<Vec<Project>, FetchError> {
        let url = self.endpoint(&["_apis", "projects"], &[("api-version", PROJECTS_API_VERSION)])?;
        let items = self.get_list(url).await?;
        Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Project>(item) {
                Ok(project) => Some(project),
                Err(err) => {
                    warn!(organization = %self.organization, error = %err, "skipping malformed project");
                    None
                }
            })
            .collect())
    }

    async fn fetch_builds(&self, project: &str, window_days: i64) -> Result<Vec<JsonValue>, FetchError> {
        let min_time = min_time_filter(Utc::now(), window_days);
        let url = self.endpoint(
            &[project, "_apis", "build", "builds"],
            &[("api-version", BUILDS_API_VERSION), ("minTime", min_time.as_str())],
        )?;
        self.get_list(url).await
    }

    async fn fetch_test_runs(&self, project: &str, build_id: &str) -> Result<Vec<JsonValue>, FetchError> {
        let build_uri = build_uri(build_id);
        let url = self.endpoint(
            &[project, "_apis", "test", "runs"],
            &[("buildUri", build_uri.as_str()), ("api-version", TEST_API_VERSION)],
        )?;
        self.get_list(url).await
    }

    async fn fetch_test_results(&self, project: &str, run_id: &str) -> Result<Vec<JsonValue>, FetchError> {
        let url = self.endpoint(
            &[project, "_apis", "test", "Runs", run_id, "results"],
            &[("api-version", TEST_API_VERSION)],
        )?;
        self.get_list(url).await
    }

    async fn fetch_coverage(&self, project: &str, build_id: &str) -> Result<Vec<JsonValue>, FetchError> {
        let url = self.endpoint(
            &[project, "_apis", "test", "codecoverage"],
            &[("buildId", build_id), ("api-version", TEST_API_VERSION)],
        )?;
        let body = self.get_json(url).await?;
        Ok(coverage_entries(body))
    }
}

fn take_array(body: &mut JsonValue, key: &str) -> Vec<JsonValue> {
    match body.get_mut(key).map(JsonValue::take) {
        Some(JsonValue::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Coverage responses carry their reports under `coverageData`, or `value`
/// when that is missing or empty.
fn coverage_entries(mut body: JsonValue) -> Vec<JsonValue> {
    let primary = take_array(&mut body, "coverageData");
    if !primary.is_empty() {
        return primary;
    }
    take_array(&mut body, "value")
}

#[async_trait]
impl SourceApi for AzureDevOpsClient {
    async fn list_projects(&self) -> Vec<Project> {
        match self.fetch_projects().await {
            Ok(projects) => {
                info!(
                    organization = %self.organization,
                    count = projects.len(),
                    "found projects in organization"
                );
                projects
            }
            Err(err) => {
                warn!(organization = %self.organization, error = %err, "error fetching projects");
                Vec::new()
            }
        }
    }

    async fn list_recent_builds(&self, project: &str, window_days: i64) -> Vec<JsonValue> {
        self.fetch_builds(project, window_days)
            .await
            .unwrap_or_else(|err| {
                warn!(project, error = %err, "error fetching builds");
                Vec::new()
            })
    }

    async fn list_test_runs(&self, project: &str, build_id: &str) -> Vec<JsonValue> {
        match self.fetch_test_runs(project, build_id).await {
            Ok(runs) => {
                if !runs.is_empty() {
                    info!(build_id, count = runs.len(), "found test runs");
                }
                runs
            }
            Err(FetchError::HttpStatus { status: 404, .. }) => {
                info!(build_id, "no test runs found");
                Vec::new()
            }
            Err(err) => {
                warn!(build_id, error = %err, "error fetching test runs");
                Vec::new()
            }
        }
    }

    async fn list_test_results(&self, project: &str, run_id: &str) -> Vec<JsonValue> {
        self.fetch_test_results(project, run_id)
            .await
            .unwrap_or_else(|err| {
                warn!(run_id, error = %err, "error fetching test results");
                Vec::new()
            })
    }

    async fn list_coverage(&self, project: &str, build_id: &str) -> Vec<JsonValue> {
        match self.fetch_coverage(project, build_id).await {
            Ok(reports) => {
                if !reports.is_empty() {
                    info!(build_id, count = reports.len(), "found code coverage reports");
                }
                reports
            }
            Err(err) => {
                warn!(build_id, error = %err, "error fetching code coverage");
                Vec::new()
            }
        }
    }
}
