//! OpenAPI documentation configuration.

use utoipa::OpenApi;

use crate::{api, error, models};

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OSTF Adapter Server",
        version = "0.1.0",
        description = "Schedules health-check test runs against cloud clusters and records their results"
    ),
    servers(
        (url = "/", description = "Local server")
    ),
    paths(
        // Health endpoints
        api::health::health,
        api::health::ready,
        // Cluster and catalog endpoints
        api::test_sets::register_cluster,
        api::test_sets::list_test_sets,
        api::test_sets::list_tests,
        // Test run endpoints
        api::test_runs::list_test_runs,
        api::test_runs::get_test_run,
        api::test_runs::last_test_runs,
        api::test_runs::start_test_runs,
        api::test_runs::update_test_runs,
        api::test_runs::record_test_result,
    ),
    components(
        schemas(
            // Common
            error::ErrorResponse,
            // Health
            api::health::HealthResponse,
            api::health::ReadyResponse,
            // Clusters and test sets
            models::RegisterClusterRequest,
            models::RegisterClusterResponse,
            models::TestSetResponse,
            models::TestResponse,
            // Test runs
            models::TestStatus,
            models::TestRunStatus,
            models::TestRunAction,
            models::TestRunResponse,
            models::TestResultUpdate,
            models::OsAccessCredentials,
            models::RunMetadata,
            models::StartTestRunRequest,
            models::UpdateTestRunRequest,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Clusters", description = "Cluster registration"),
        (name = "Test Sets", description = "Test sets and tests applicable to a cluster"),
        (name = "Test Runs", description = "Start, restart, stop and report test runs")
    )
)]
pub struct ApiDoc;
