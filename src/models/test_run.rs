//! Test run domain models and DTOs.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;

use super::{TestResponse, TestStatus};
use crate::entity::{test, test_run};

/// Test run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestRunStatus {
    /// Created, runner not yet picked it up.
    WaitRunning,
    Running,
    /// Every test settled or the runner exited.
    Finished,
    /// Runner killed on request.
    Stopped,
}

impl TestRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitRunning => "wait_running",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Stopped => "stopped",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "wait_running" => Some(Self::WaitRunning),
            "running" => Some(Self::Running),
            "finished" => Some(Self::Finished),
            "stopped" => Some(Self::Stopped),
            _ => None,
        }
    }

    /// An active run blocks new starts and restarts for its test set and cluster.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::WaitRunning | Self::Running)
    }
}

impl std::fmt::Display for TestRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A test run together with its private test rows.
#[derive(Debug, Clone)]
pub struct TestRunDetail {
    pub run: test_run::Model,
    pub tests: Vec<test::Model>,
}

impl TestRunDetail {
    pub fn status(&self) -> Option<TestRunStatus> {
        TestRunStatus::parse(&self.run.status)
    }

    /// Names of tests that take part in the run.
    pub fn enabled_tests(&self) -> Vec<String> {
        enabled_test_names(&self.tests)
    }

    pub fn test(&self, name: &str) -> Option<&test::Model> {
        self.tests.iter().find(|t| t.name == name)
    }
}

/// Names of the rows that are not `disabled`.
pub fn enabled_test_names(tests: &[test::Model]) -> Vec<String> {
    tests
        .iter()
        .filter(|t| t.status.as_deref() != Some(TestStatus::Disabled.as_str()))
        .map(|t| t.name.clone())
        .collect()
}

/// Test run as presented to API clients.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TestRunResponse {
    pub id: i32,
    pub testset: String,
    #[schema(value_type = Option<Object>)]
    pub meta: Option<JsonValue>,
    pub cluster_id: i32,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub tests: Vec<TestResponse>,
}

impl From<TestRunDetail> for TestRunResponse {
    fn from(detail: TestRunDetail) -> Self {
        let run = detail.run;
        TestRunResponse {
            id: run.id,
            testset: run.test_set_id,
            meta: run.meta,
            cluster_id: run.cluster_id,
            status: run.status,
            started_at: run.started_at,
            ended_at: run.ended_at,
            tests: detail.tests.into_iter().map(TestResponse::from).collect(),
        }
    }
}

/// Cloud credentials handed to the runner so scenarios can reach the cluster.
#[derive(Debug, Deserialize, ToSchema)]
pub struct OsAccessCredentials {
    pub username: String,
    #[serde(deserialize_with = "deserialize_secret")]
    #[schema(value_type = String)]
    pub password: SecretString,
    pub tenant: String,
}

/// Run metadata supplied by the caller on start.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RunMetadata {
    pub cluster_id: i32,
    #[serde(default)]
    pub ostf_os_access_creds: Option<OsAccessCredentials>,
    /// Free-form configuration stored on the run.
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub config: Option<JsonValue>,
}

/// Request to start a test run.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StartTestRunRequest {
    /// Test set id.
    pub testset: String,
    pub metadata: RunMetadata,
    /// Tests to execute; empty means all tests of the set.
    #[serde(default)]
    pub tests: Vec<String>,
}

/// Requested transition for an existing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TestRunAction {
    Stopped,
    Restarted,
}

/// Request to stop or restart a test run.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTestRunRequest {
    pub id: i32,
    pub status: TestRunAction,
    /// Tests to re-queue on restart.
    #[serde(default)]
    pub tests: Vec<String>,
    #[serde(default)]
    pub ostf_os_access_creds: Option<OsAccessCredentials>,
}

/// Wrap a plain JSON string into a secret as soon as it is parsed.
fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
