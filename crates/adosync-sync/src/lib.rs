//! Sync pipeline orchestration: Azure DevOps builds, tests, and coverage into Port.

use adosync_clients::{
    AuthError, AzureDevOpsClient, AzureDevOpsConfig, BlueprintSummary, CatalogSink,
    HttpClientConfig, PortClient, PortConfig, SourceApi,
};
use adosync_core::{
    map_build, map_coverage_report, map_test_result, map_test_run, Blueprints, Entity, EntityKind,
    MappedBuild, Project,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

pub const CRATE_NAME: &str = "adosync-sync";

/// Every run re-fetches this many days of builds.
pub const BUILD_WINDOW_DAYS: i64 = 30;

pub const DEFAULT_AZURE_DEVOPS_BASE_URL: &str = "https://dev.azure.com";
pub const DEFAULT_PORT_BASE_URL: &str = "https://api.getport.io/v1";
pub const DEFAULT_USER_AGENT: &str = "adosync/0.1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub azure_devops: AzureDevOpsConfig,
    pub port: PortConfig,
    pub blueprints: Blueprints,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let required = |name: &'static str| read(name).ok_or(ConfigError::Missing(name));
        let or_default = |name: &str, default: &str| read(name).unwrap_or_else(|| default.to_string());

        let http = HttpClientConfig {
            user_agent: Some(or_default("ADOSYNC_USER_AGENT", DEFAULT_USER_AGENT)),
            ..Default::default()
        };
        let defaults = Blueprints::default();

        Ok(Self {
            azure_devops: AzureDevOpsConfig {
                base_url: or_default("AZURE_DEVOPS_BASE_URL", DEFAULT_AZURE_DEVOPS_BASE_URL),
                organization: required("AZURE_DEVOPS_ORG")?,
                personal_access_token: required("AZURE_DEVOPS_PAT")?,
                http: http.clone(),
            },
            port: PortConfig {
                base_url: or_default("PORT_BASE_URL", DEFAULT_PORT_BASE_URL),
                client_id: required("PORT_CLIENT_ID")?,
                client_secret: required("PORT_CLIENT_SECRET")?,
                http,
            },
            blueprints: Blueprints {
                build: or_default("PORT_BLUEPRINT_BUILD", defaults.build.as_str()),
                test_run: or_default("PORT_BLUEPRINT_TEST_RUN", defaults.test_run.as_str()),
                test_result: or_default("PORT_BLUEPRINT_TEST_RESULT", defaults.test_result.as_str()),
                coverage: or_default("PORT_BLUEPRINT_COVERAGE", defaults.coverage.as_str()),
                repository: or_default("PORT_BLUEPRINT_REPOSITORY", defaults.repository.as_str()),
            },
        })
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("failed to authenticate with port: {0}")]
    Authentication(#[source] AuthError),
    #[error("no projects found; check the azure devops organization configuration")]
    NoProjects,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub projects: usize,
    pub builds: usize,
    pub test_runs: usize,
    pub test_results: usize,
    pub coverage_rows: usize,
    pub upserts_succeeded: usize,
    pub upserts_failed: usize,
}

#[derive(Debug, Default)]
struct Tally {
    builds: usize,
    test_runs: usize,
    test_results: usize,
    coverage_rows: usize,
    upserts_succeeded: usize,
    upserts_failed: usize,
}

/// Sequential walk: projects, builds, test runs and results, coverage rows.
/// Only authentication and an empty project list stop a run.
pub struct SyncPipeline {
    source: Box<dyn SourceApi>,
    catalog: Box<dyn CatalogSink>,
    blueprints: Blueprints,
}

impl SyncPipeline {
    pub fn new(
        source: Box<dyn SourceApi>,
        catalog: Box<dyn CatalogSink>,
        blueprints: Blueprints,
    ) -> Self {
        Self {
            source,
            catalog,
            blueprints,
        }
    }

    pub async fn run_once(&mut self) -> Result<SyncRunSummary, SyncError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync_run", %run_id);
        self.run(run_id).instrument(span).await
    }

    async fn run(&mut self, run_id: Uuid) -> Result<SyncRunSummary, SyncError> {
        let started_at = Utc::now();
        info!("starting azure devops sync");

        info!("authenticating with port");
        if let Err(err) = self.catalog.authenticate().await {
            error!(error = %err, "failed to authenticate with port; exiting");
            return Err(SyncError::Authentication(err));
        }
        info!("authenticated with port");

        let projects = self.source.list_projects().await;
        if projects.is_empty() {
            error!("no projects found; check the azure devops organization configuration");
            return Err(SyncError::NoProjects);
        }

        let mut tally = Tally::default();
        for project in &projects {
            let span = info_span!("project", name = %project.name, id = %project.id);
            self.sync_project(project, &mut tally).instrument(span).await;
        }

        info!(
            builds = tally.builds,
            projects = projects.len(),
            upserts_failed = tally.upserts_failed,
            "sync completed"
        );

        Ok(SyncRunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            projects: projects.len(),
            builds: tally.builds,
            test_runs: tally.test_runs,
            test_results: tally.test_results,
            coverage_rows: tally.coverage_rows,
            upserts_succeeded: tally.upserts_succeeded,
            upserts_failed: tally.upserts_failed,
        })
    }

    async fn sync_project(&self, project: &Project, tally: &mut Tally) {
        info!("processing project");
        let builds = self
            .source
            .list_recent_builds(&project.name, BUILD_WINDOW_DAYS)
            .await;
        info!(
            count = builds.len(),
            window_days = BUILD_WINDOW_DAYS,
            "found builds in project"
        );
        if builds.is_empty() {
            info!("no builds found in project");
            return;
        }

        tally.builds += builds.len();
        for build in &builds {
            let mapped = match map_build(&project.name, build) {
                Ok(mapped) => mapped,
                Err(err) => {
                    warn!(error = %err, "skipping build");
                    continue;
                }
            };
            let span = info_span!("build", build_id = %mapped.build_id);
            self.sync_build(&project.name, mapped, tally)
                .instrument(span)
                .await;
        }
    }

    async fn sync_build(&self, project: &str, build: MappedBuild, tally: &mut Tally) {
        info!("processing build");
        if let Some(repository) = build.entity.relations.get("repository") {
            info!(%repository, "linking build to repository");
        }
        self.upsert(EntityKind::Build, &build.entity, tally).await;

        let build_id = build.build_id.as_str();
        for run in self.source.list_test_runs(project, build_id).await {
            let run = match map_test_run(build_id, &run) {
                Ok(run) => run,
                Err(err) => {
                    warn!(error = %err, "skipping test run");
                    continue;
                }
            };
            tally.test_runs += 1;
            self.upsert(EntityKind::TestRun, &run.entity, tally).await;

            for result in self.source.list_test_results(project, &run.run_id).await {
                match map_test_result(&run.run_id, &result) {
                    Ok(entity) => {
                        tally.test_results += 1;
                        self.upsert(EntityKind::TestResult, &entity, tally).await;
                    }
                    Err(err) => warn!(run_id = %run.run_id, error = %err, "skipping test result"),
                }
            }
        }

        for report in self.source.list_coverage(project, build_id).await {
            for row in map_coverage_report(build_id, &report) {
                tally.coverage_rows += 1;
                self.upsert(EntityKind::Coverage, &row, tally).await;
            }
        }
    }

    async fn upsert(&self, kind: EntityKind, entity: &Entity, tally: &mut Tally) {
        let blueprint = self.blueprints.for_kind(kind);
        match self.catalog.upsert(blueprint, entity).await {
            Ok(_) => {
                info!(
                    kind = kind.as_str(),
                    blueprint,
                    identifier = %entity.identifier,
                    "upserted entity"
                );
                tally.upserts_succeeded += 1;
            }
            Err(err) => {
                warn!(
                    blueprint,
                    identifier = %entity.identifier,
                    error = %err,
                    "failed to upsert entity"
                );
                tally.upserts_failed += 1;
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueprintCheck {
    pub role: &'static str,
    pub identifier: String,
    pub present: bool,
}

#[derive(Debug, Clone)]
pub struct BlueprintReport {
    pub available: Vec<BlueprintSummary>,
    pub checks: Vec<BlueprintCheck>,
}

/// Matches each configured blueprint against what the catalog exposes.
pub fn check_blueprints(configured: &Blueprints, available: &[BlueprintSummary]) -> Vec<BlueprintCheck> {
    configured
        .all()
        .into_iter()
        .map(|(role, identifier)| BlueprintCheck {
            role,
            identifier: identifier.to_string(),
            present: available.iter().any(|b| b.identifier == identifier),
        })
        .collect()
}

pub async fn run_sync_once_from_env() -> Result<SyncRunSummary> {
    let config = SyncConfig::from_env().context("loading configuration")?;
    let source =
        AzureDevOpsClient::new(config.azure_devops).context("building azure devops client")?;
    let catalog = PortClient::new(config.port).context("building port client")?;
    let mut pipeline = SyncPipeline::new(Box::new(source), Box::new(catalog), config.blueprints);
    Ok(pipeline.run_once().await?)
}

pub async fn list_blueprints_from_env() -> Result<BlueprintReport> {
    let config = SyncConfig::from_env().context("loading configuration")?;
    let mut catalog = PortClient::new(config.port).context("building port client")?;
    catalog
        .authenticate()
        .await
        .map_err(SyncError::Authentication)?;

    let available = catalog
        .list_blueprints()
        .await
        .context("listing port blueprints")?;
    info!(count = available.len(), "found blueprints in port");
    for blueprint in &available {
        info!(
            identifier = %blueprint.identifier,
            title = blueprint.title.as_deref().unwrap_or_default(),
            "blueprint"
        );
    }

    let checks = check_blueprints(&config.blueprints, &available);
    for check in checks.iter().filter(|c| !c.present) {
        warn!(role = check.role, identifier = %check.identifier, "configured blueprint not found in port");
    }
    Ok(BlueprintReport { available, checks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use adosync_clients::CatalogError;
    use async_trait::async_trait;
    use serde_json::{json, Value as JsonValue};
    use std::collections::{BTreeMap, HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    type Store = Arc<Mutex<BTreeMap<(String, String), Entity>>>;

    #[derive(Default)]
    struct FakeSource {
        projects: Vec<Project>,
        builds: HashMap<String, Vec<JsonValue>>,
        runs: HashMap<String, Vec<JsonValue>>,
        results: HashMap<String, Vec<JsonValue>>,
        coverage: HashMap<String, Vec<JsonValue>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeSource {
        fn log(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl SourceApi for FakeSource {
        async fn list_projects(&self) -> Vec<Project> {
            self.log("projects".to_string());
            self.projects.clone()
        }

        async fn list_recent_builds(&self, project: &str, window_days: i64) -> Vec<JsonValue> {
            self.log(format!("builds:{project}:{window_days}"));
            self.builds.get(project).cloned().unwrap_or_default()
        }

        async fn list_test_runs(&self, project: &str, build_id: &str) -> Vec<JsonValue> {
            self.log(format!("runs:{project}:{build_id}"));
            self.runs.get(build_id).cloned().unwrap_or_default()
        }

        async fn list_test_results(&self, project: &str, run_id: &str) -> Vec<JsonValue> {
            self.log(format!("results:{project}:{run_id}"));
            self.results.get(run_id).cloned().unwrap_or_default()
        }

        async fn list_coverage(&self, project: &str, build_id: &str) -> Vec<JsonValue> {
            self.log(format!("coverage:{project}:{build_id}"));
            self.coverage.get(build_id).cloned().unwrap_or_default()
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        reject_auth: bool,
        token: Option<String>,
        failing: HashSet<String>,
        store: Store,
        writes: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl CatalogSink for FakeCatalog {
        async fn authenticate(&mut self) -> Result<(), AuthError> {
            if self.reject_auth {
                return Err(AuthError::HttpStatus(401));
            }
            self.token = Some("tok".to_string());
            Ok(())
        }

        async fn upsert(&self, blueprint: &str, entity: &Entity) -> Result<JsonValue, CatalogError> {
            if self.token.is_none() {
                return Err(CatalogError::NotAuthenticated);
            }
            self.writes
                .lock()
                .unwrap()
                .push((blueprint.to_string(), entity.identifier.clone()));
            if self.failing.contains(&entity.identifier) {
                return Err(CatalogError::HttpStatus {
                    status: 500,
                    url: format!("fake://{blueprint}"),
                });
            }
            self.store
                .lock()
                .unwrap()
                .insert((blueprint.to_string(), entity.identifier.clone()), entity.clone());
            Ok(serde_json::to_value(entity).unwrap())
        }
    }

    fn project(name: &str) -> Project {
        Project {
            id: format!("id-{name}"),
            name: name.to_string(),
        }
    }

    fn alpha_source() -> FakeSource {
        let mut source = FakeSource {
            projects: vec![project("Alpha")],
            ..Default::default()
        };
        source.builds.insert(
            "Alpha".to_string(),
            vec![json!({
                "id": 101,
                "buildNumber": "101.1",
                "status": "completed",
                "definition": {"name": "svc-ci"},
                "repository": {"name": "svc"}
            })],
        );
        source.runs.insert(
            "101".to_string(),
            vec![json!({"id": 5001, "totalTests": 10, "passedTests": 9, "unanalyzedTests": 1})],
        );
        source
            .results
            .insert("5001".to_string(), vec![json!({"id": 1, "outcome": "Failed"})]);
        source.coverage.insert(
            "101".to_string(),
            vec![json!({
                "url": "https://cov.example/101",
                "modules": [{
                    "name": "svc.dll",
                    "coverageData": [{"coverageType": "Lines", "covered": 45, "total": 50}]
                }]
            })],
        );
        source
    }

    fn stored(store: &Store, blueprint: &str, identifier: &str) -> Entity {
        store
            .lock()
            .unwrap()
            .get(&(blueprint.to_string(), identifier.to_string()))
            .cloned()
            .unwrap_or_else(|| panic!("{blueprint}:{identifier} not upserted"))
    }

    #[tokio::test]
    async fn syncs_build_runs_results_and_coverage() {
        let catalog = FakeCatalog::default();
        let store = catalog.store.clone();
        let mut pipeline =
            SyncPipeline::new(Box::new(alpha_source()), Box::new(catalog), Blueprints::default());

        let summary = pipeline.run_once().await.unwrap();
        assert_eq!(summary.projects, 1);
        assert_eq!(summary.builds, 1);
        assert_eq!(summary.test_runs, 1);
        assert_eq!(summary.test_results, 1);
        assert_eq!(summary.coverage_rows, 1);
        assert_eq!(summary.upserts_succeeded, 4);
        assert_eq!(summary.upserts_failed, 0);

        let build = stored(&store, "azure_dev_ops_build", "101");
        assert_eq!(build.properties["owning_repository"], json!("svc"));
        assert_eq!(build.properties["build_number"], json!("101.1"));
        assert_eq!(build.relations.get("repository").unwrap(), "alpha/svc");

        let run = stored(&store, "azureTestRun", "testrun-5001");
        assert_eq!(run.properties["failedTests"], json!(1));
        assert_eq!(run.relations.get("build").unwrap(), "101");

        let result = stored(&store, "azureTestResult", "testresult-5001-1");
        assert_eq!(result.properties["outcome"], json!("Failed"));
        assert_eq!(result.relations.get("run").unwrap(), "testrun-5001");

        let coverage = stored(&store, "azureCodeCoverage", "coverage-101-Lines-svc.dll");
        assert_eq!(coverage.properties["percentage"], json!(90.0));
        assert_eq!(coverage.relations.get("build").unwrap(), "101");
    }

    #[tokio::test]
    async fn run_summary_serializes_with_run_id_and_timestamps() {
        let mut pipeline = SyncPipeline::new(
            Box::new(alpha_source()),
            Box::new(FakeCatalog::default()),
            Blueprints::default(),
        );
        let summary = pipeline.run_once().await.unwrap();

        let body = serde_json::to_value(&summary).unwrap();
        assert_eq!(body["run_id"], json!(summary.run_id.to_string()));
        let started_at = body["started_at"].as_str().unwrap();
        assert_eq!(
            DateTime::parse_from_rfc3339(started_at).unwrap().with_timezone(&Utc),
            summary.started_at
        );
        assert_eq!(body["upserts_succeeded"], json!(4));
    }

    #[tokio::test]
    async fn builds_are_requested_over_a_thirty_day_window_in_order() {
        let source = alpha_source();
        let calls = source.calls.clone();
        let mut pipeline =
            SyncPipeline::new(Box::new(source), Box::new(FakeCatalog::default()), Blueprints::default());
        pipeline.run_once().await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                "projects".to_string(),
                "builds:Alpha:30".to_string(),
                "runs:Alpha:101".to_string(),
                "results:Alpha:5001".to_string(),
                "coverage:Alpha:101".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn authentication_failure_aborts_before_any_fetch() {
        let source = alpha_source();
        let calls = source.calls.clone();
        let catalog = FakeCatalog {
            reject_auth: true,
            ..Default::default()
        };
        let writes = catalog.writes.clone();
        let mut pipeline = SyncPipeline::new(Box::new(source), Box::new(catalog), Blueprints::default());

        let err = pipeline.run_once().await.unwrap_err();
        assert!(matches!(err, SyncError::Authentication(AuthError::HttpStatus(401))));
        assert!(calls.lock().unwrap().is_empty());
        assert!(writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_project_list_aborts_the_run() {
        let source = FakeSource::default();
        let calls = source.calls.clone();
        let mut pipeline =
            SyncPipeline::new(Box::new(source), Box::new(FakeCatalog::default()), Blueprints::default());

        let err = pipeline.run_once().await.unwrap_err();
        assert!(matches!(err, SyncError::NoProjects));
        assert_eq!(*calls.lock().unwrap(), vec!["projects".to_string()]);
    }

    #[tokio::test]
    async fn project_without_builds_is_skipped() {
        let mut source = alpha_source();
        source.projects.insert(0, project("Empty"));
        let catalog = FakeCatalog::default();
        let store = catalog.store.clone();
        let mut pipeline = SyncPipeline::new(Box::new(source), Box::new(catalog), Blueprints::default());

        let summary = pipeline.run_once().await.unwrap();
        assert_eq!(summary.projects, 2);
        assert_eq!(summary.builds, 1);
        assert_eq!(store.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn rerun_overwrites_instead_of_duplicating() {
        let store = Store::default();

        let mut first = SyncPipeline::new(
            Box::new(alpha_source()),
            Box::new(FakeCatalog {
                store: store.clone(),
                ..Default::default()
            }),
            Blueprints::default(),
        );
        first.run_once().await.unwrap();
        let after_first = store.lock().unwrap().clone();

        let mut second = SyncPipeline::new(
            Box::new(alpha_source()),
            Box::new(FakeCatalog {
                store: store.clone(),
                ..Default::default()
            }),
            Blueprints::default(),
        );
        second.run_once().await.unwrap();

        assert_eq!(after_first.len(), 4);
        assert_eq!(*store.lock().unwrap(), after_first);
    }

    #[tokio::test]
    async fn failed_upsert_does_not_stop_the_build() {
        let catalog = FakeCatalog {
            failing: HashSet::from(["101".to_string()]),
            ..Default::default()
        };
        let writes = catalog.writes.clone();
        let mut pipeline =
            SyncPipeline::new(Box::new(alpha_source()), Box::new(catalog), Blueprints::default());

        let summary = pipeline.run_once().await.unwrap();
        assert_eq!(summary.upserts_failed, 1);
        assert_eq!(summary.upserts_succeeded, 3);
        let identifiers = writes
            .lock()
            .unwrap()
            .iter()
            .map(|(_, id)| id.clone())
            .collect::<Vec<_>>();
        assert_eq!(
            identifiers,
            vec!["101", "testrun-5001", "testresult-5001-1", "coverage-101-Lines-svc.dll"]
        );
    }

    #[tokio::test]
    async fn build_without_id_is_skipped_and_the_next_one_processed() {
        let mut source = alpha_source();
        source
            .builds
            .get_mut("Alpha")
            .unwrap()
            .insert(0, json!({"buildNumber": "orphan"}));
        let catalog = FakeCatalog::default();
        let store = catalog.store.clone();
        let mut pipeline = SyncPipeline::new(Box::new(source), Box::new(catalog), Blueprints::default());

        let summary = pipeline.run_once().await.unwrap();
        assert_eq!(summary.builds, 2);
        assert!(store
            .lock()
            .unwrap()
            .contains_key(&("azure_dev_ops_build".to_string(), "101".to_string())));
    }

    #[tokio::test]
    async fn summary_coverage_stats_are_synced_as_one_module() {
        let mut source = alpha_source();
        source.coverage.insert(
            "101".to_string(),
            vec![json!({"coverageStats": [{"label": "Blocks", "covered": 0, "total": 0}]})],
        );
        let catalog = FakeCatalog::default();
        let store = catalog.store.clone();
        let mut pipeline = SyncPipeline::new(Box::new(source), Box::new(catalog), Blueprints::default());
        pipeline.run_once().await.unwrap();

        let row = stored(&store, "azureCodeCoverage", "coverage-101-Blocks-summary");
        assert_eq!(row.properties["moduleName"], json!("summary"));
        assert_eq!(row.properties["percentage"], json!(0.0));
    }

    #[tokio::test]
    async fn configured_blueprints_route_entities() {
        let catalog = FakeCatalog::default();
        let store = catalog.store.clone();
        let blueprints = Blueprints {
            build: "ci_build".to_string(),
            ..Blueprints::default()
        };
        let mut pipeline = SyncPipeline::new(Box::new(alpha_source()), Box::new(catalog), blueprints);
        pipeline.run_once().await.unwrap();

        stored(&store, "ci_build", "101");
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |name: &str| map.get(name).cloned()
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("AZURE_DEVOPS_ORG", "contoso"),
        ("AZURE_DEVOPS_PAT", "pat"),
        ("PORT_CLIENT_ID", "id"),
        ("PORT_CLIENT_SECRET", "secret"),
    ];

    #[test]
    fn config_applies_defaults() {
        let config = SyncConfig::from_lookup(env(&REQUIRED)).unwrap();
        assert_eq!(config.azure_devops.base_url, DEFAULT_AZURE_DEVOPS_BASE_URL);
        assert_eq!(config.azure_devops.organization, "contoso");
        assert_eq!(config.port.base_url, DEFAULT_PORT_BASE_URL);
        assert_eq!(config.blueprints, Blueprints::default());
        assert_eq!(config.port.http.user_agent.as_deref(), Some(DEFAULT_USER_AGENT));
        assert_eq!(config.port.http.timeout, std::time::Duration::from_secs(30));
    }

    #[test]
    fn config_reads_overrides_and_trims() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PORT_BLUEPRINT_COVERAGE", "  coverage_v2 "));
        pairs.push(("PORT_BASE_URL", "https://api.port.example/v1"));
        pairs.push(("PORT_BLUEPRINT_BUILD", "   "));
        let config = SyncConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.blueprints.coverage, "coverage_v2");
        assert_eq!(config.blueprints.build, "azure_dev_ops_build");
        assert_eq!(config.port.base_url, "https://api.port.example/v1");
    }

    #[test]
    fn config_requires_credentials() {
        let pairs = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "PORT_CLIENT_SECRET")
            .collect::<Vec<_>>();
        assert_eq!(
            SyncConfig::from_lookup(env(&pairs)).unwrap_err(),
            ConfigError::Missing("PORT_CLIENT_SECRET")
        );
    }

    #[test]
    fn blueprint_check_flags_missing_identifiers() {
        let available = vec![
            BlueprintSummary {
                identifier: "azure_dev_ops_build".to_string(),
                title: Some("Build".to_string()),
            },
            BlueprintSummary {
                identifier: "azureTestRun".to_string(),
                title: None,
            },
        ];
        let checks = check_blueprints(&Blueprints::default(), &available);
        assert_eq!(checks.len(), 5);
        let missing = checks
            .iter()
            .filter(|c| !c.present)
            .map(|c| c.role)
            .collect::<Vec<_>>();
        assert_eq!(missing, vec!["test_result", "coverage", "repository"]);
    }
}
