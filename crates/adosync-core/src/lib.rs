//! Catalog entity model and Azure DevOps to catalog mapping for adosync.
//!
//! Everything in this crate is pure: mappers take one source JSON object and
//! produce flat [`Entity`] records whose identifiers are stable across runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;

pub const CRATE_NAME: &str = "adosync-core";

pub const BUILD_URI_PREFIX: &str = "vstfs:///Build/Build/";
pub const SUMMARY_MODULE_NAME: &str = "summary";
pub const UNKNOWN_LABEL: &str = "unknown";

/// Azure DevOps project as listed by `_apis/projects`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One catalog record: identifier, flat properties, and named relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub identifier: String,
    pub properties: Map<String, JsonValue>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relations: BTreeMap<String, String>,
}

impl Entity {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            properties: Map::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<JsonValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_relation(mut self, key: &str, target: impl Into<String>) -> Self {
        self.relations.insert(key.to_string(), target.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Build,
    TestRun,
    TestResult,
    Coverage,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Build => "build",
            EntityKind::TestRun => "test_run",
            EntityKind::TestResult => "test_result",
            EntityKind::Coverage => "coverage",
        }
    }
}

/// Destination blueprint identifiers for each record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blueprints {
    pub build: String,
    pub test_run: String,
    pub test_result: String,
    pub coverage: String,
    /// Target of the build `repository` relation; never written by the sync.
    pub repository: String,
}

impl Default for Blueprints {
    fn default() -> Self {
        Self {
            build: "azure_dev_ops_build".to_string(),
            test_run: "azureTestRun".to_string(),
            test_result: "azureTestResult".to_string(),
            coverage: "azureCodeCoverage".to_string(),
            repository: "azureDevopsRepository".to_string(),
        }
    }
}

impl Blueprints {
    pub fn for_kind(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Build => &self.build,
            EntityKind::TestRun => &self.test_run,
            EntityKind::TestResult => &self.test_result,
            EntityKind::Coverage => &self.coverage,
        }
    }

    /// All configured blueprints, labelled by role.
    pub fn all(&self) -> [(&'static str, &str); 5] {
        [
            ("build", self.build.as_str()),
            ("test_run", self.test_run.as_str()),
            ("test_result", self.test_result.as_str()),
            ("coverage", self.coverage.as_str()),
            ("repository", self.repository.as_str()),
        ]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    #[error("{kind} record has no usable id")]
    MissingId { kind: &'static str },
    #[error("build id {0:?} is not numeric")]
    NonNumericBuildId(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedBuild {
    pub build_id: String,
    pub entity: Entity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MappedTestRun {
    pub run_id: String,
    pub entity: Entity,
}

fn json_path<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    let mut cur = value;
    for segment in path {
        cur = cur.get(*segment)?;
    }
    Some(cur)
}

pub fn json_str<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a str> {
    json_path(value, path)?.as_str()
}

fn non_empty_str<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a str> {
    json_str(value, path).filter(|s| !s.is_empty())
}

/// Field value as-is, `null` when absent.
fn passthrough(value: &JsonValue, path: &[&str]) -> JsonValue {
    json_path(value, path).cloned().unwrap_or(JsonValue::Null)
}

/// Numeric field as-is, `0` when absent or null.
fn count_or_zero(value: &JsonValue, key: &str) -> JsonValue {
    match value.get(key) {
        Some(v) if !v.is_null() => v.clone(),
        _ => JsonValue::from(0),
    }
}

/// The `id` of a source record, accepting both numeric and string ids.
pub fn source_id(value: &JsonValue, kind: &'static str) -> Result<String, MapError> {
    match value.get("id") {
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        Some(JsonValue::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(MapError::MissingId { kind }),
    }
}

/// `minTime` filter for the build listing: `now - days`, UTC, suffixed `Z`.
pub fn min_time_filter(now: DateTime<Utc>, days: i64) -> String {
    (now - Duration::days(days))
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

pub fn build_uri(build_id: &str) -> String {
    format!("{BUILD_URI_PREFIX}{build_id}")
}

pub fn repository_identifier(project_name: &str, repository_name: &str) -> String {
    format!("{}/{}", project_name.to_lowercase(), repository_name)
}

pub fn test_run_identifier(run_id: &str) -> String {
    format!("testrun-{run_id}")
}

pub fn test_result_identifier(run_id: &str, result_id: &str) -> String {
    format!("testresult-{run_id}-{result_id}")
}

/// Coverage row identifier. `/` and spaces become `-`; distinct inputs that
/// coincide after substitution share an identifier.
pub fn coverage_identifier(build_id: &str, coverage_type: &str, module_name: &str) -> String {
    format!("coverage-{build_id}-{coverage_type}-{module_name}")
        .replace('/', "-")
        .replace(' ', "-")
}

pub fn coverage_percentage(covered: f64, total: f64) -> f64 {
    if total > 0.0 {
        covered / total * 100.0
    } else {
        0.0
    }
}

pub fn map_build(project_name: &str, build: &JsonValue) -> Result<MappedBuild, MapError> {
    let build_id = source_id(build, "build")?;
    let numeric_id = build_id
        .parse::<i64>()
        .map_err(|_| MapError::NonNumericBuildId(build_id.clone()))?;
    let repository = non_empty_str(build, &["repository", "name"]);

    let mut entity = Entity::new(build_id.clone())
        .with_property("message", json_str(build, &["definition", "name"]).unwrap_or_default())
        .with_property("build_id", numeric_id)
        .with_property("build_number", json_str(build, &["buildNumber"]).unwrap_or_default())
        .with_property("status", json_str(build, &["status"]).unwrap_or_default())
        .with_property("owning_repository", repository.unwrap_or_default());

    if let Some(repo) = repository {
        entity = entity.with_relation("repository", repository_identifier(project_name, repo));
    }

    Ok(MappedBuild { build_id, entity })
}

pub fn map_test_run(build_id: &str, run: &JsonValue) -> Result<MappedTestRun, MapError> {
    let run_id = source_id(run, "test run")?;
    // Only the first statistics entry is read.
    let duration = run
        .get("runStatistics")
        .and_then(JsonValue::as_array)
        .and_then(|stats| stats.first())
        .and_then(|first| first.get("duration"))
        .cloned()
        .unwrap_or_else(|| JsonValue::from(0));

    let entity = Entity::new(test_run_identifier(&run_id))
        .with_property("state", passthrough(run, &["state"]))
        .with_property("totalTests", passthrough(run, &["totalTests"]))
        .with_property("passedTests", passthrough(run, &["passedTests"]))
        .with_property("failedTests", passthrough(run, &["unanalyzedTests"]))
        .with_property("startTime", passthrough(run, &["startedDate"]))
        .with_property("completeTime", passthrough(run, &["completedDate"]))
        .with_property("durationSec", duration)
        .with_relation("build", build_id);

    Ok(MappedTestRun { run_id, entity })
}

pub fn map_test_result(run_id: &str, result: &JsonValue) -> Result<Entity, MapError> {
    let result_id = source_id(result, "test result")?;
    Ok(Entity::new(test_result_identifier(run_id, &result_id))
        .with_property("testCaseTitle", passthrough(result, &["testCaseTitle"]))
        .with_property("outcome", passthrough(result, &["outcome"]))
        .with_property("durationMs", passthrough(result, &["durationInMs"]))
        .with_property("owner", passthrough(result, &["owner", "displayName"]))
        .with_property("automatedTestName", passthrough(result, &["automatedTestName"]))
        .with_property("automatedTestType", passthrough(result, &["automatedTestType"]))
        .with_property("errorMessage", passthrough(result, &["errorMessage"]))
        .with_property("stackTrace", passthrough(result, &["stackTrace"]))
        .with_relation("run", test_run_identifier(run_id)))
}

/// Modules of a coverage report. Reports carrying a flat `coverageStats`
/// list instead of `modules` yield one synthetic `summary` module.
pub fn coverage_modules(report: &JsonValue) -> Vec<JsonValue> {
    let modules = report
        .get("modules")
        .and_then(JsonValue::as_array)
        .cloned()
        .unwrap_or_default();
    if !modules.is_empty() {
        return modules;
    }
    match report.get("coverageStats") {
        Some(stats) => {
            let rows = stats.as_array().cloned().unwrap_or_default();
            vec![json!({ "name": SUMMARY_MODULE_NAME, "coverageData": rows })]
        }
        None => Vec::new(),
    }
}

fn coverage_type(row: &JsonValue) -> &str {
    non_empty_str(row, &["coverageType"])
        .or_else(|| non_empty_str(row, &["label"]))
        .unwrap_or(UNKNOWN_LABEL)
}

/// Flattens one coverage report into coverage-row entities.
pub fn map_coverage_report(build_id: &str, report: &JsonValue) -> Vec<Entity> {
    let report_url = json_str(report, &["url"]).unwrap_or_default();
    let mut rows = Vec::new();

    for module in coverage_modules(report) {
        let module_name = json_str(&module, &["name"]).unwrap_or(UNKNOWN_LABEL);
        let Some(data) = module.get("coverageData").and_then(JsonValue::as_array) else {
            continue;
        };
        for row in data {
            let kind = coverage_type(row);
            let covered = count_or_zero(row, "covered");
            let total = count_or_zero(row, "total");
            let percentage = coverage_percentage(
                covered.as_f64().unwrap_or(0.0),
                total.as_f64().unwrap_or(0.0),
            );

            rows.push(
                Entity::new(coverage_identifier(build_id, kind, module_name))
                    .with_property("coverage_type", kind)
                    .with_property("moduleName", module_name)
                    .with_property("covered", covered)
                    .with_property("total", total)
                    .with_property("percentage", percentage)
                    .with_property("reportUrl", report_url)
                    .with_relation("build", build_id),
            );
        }
    }

    rows
}
