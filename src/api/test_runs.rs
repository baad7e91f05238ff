//! Test run API handlers.

use actix_web::{HttpRequest, HttpResponse, web};
use secrecy::SecretString;
use serde::Deserialize;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::{
    StartTestRunRequest, TestResponse, TestResultUpdate, TestRunAction, TestRunResponse,
    UpdateTestRunRequest,
};
use crate::services::{RunOptions, RunTracker};

/// Header carrying the cloud auth token forwarded to runners.
pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

fn auth_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// List all test runs with their tests, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/testruns",
    tag = "Test Runs",
    responses(
        (status = 200, description = "All test runs", body = Vec<TestRunResponse>)
    )
)]
pub async fn list_test_runs(pool: web::Data<DbPool>) -> AppResult<HttpResponse> {
    let runs: Vec<TestRunResponse> = pool
        .list_test_runs()
        .await?
        .into_iter()
        .map(TestRunResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(runs))
}

/// Get a test run by ID.
#[utoipa::path(
    get,
    path = "/api/v1/testruns/{id}",
    tag = "Test Runs",
    params(("id" = i32, Path, description = "Test run ID")),
    responses(
        (status = 200, description = "Test run", body = TestRunResponse),
        (status = 404, description = "Test run not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_test_run(pool: web::Data<DbPool>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let detail = pool
        .get_test_run_detail(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Test run {}", id)))?;

    Ok(HttpResponse::Ok().json(TestRunResponse::from(detail)))
}

/// Latest run of every test set on a cluster.
#[utoipa::path(
    get,
    path = "/api/v1/testruns/last/{cluster_id}",
    tag = "Test Runs",
    params(("cluster_id" = i32, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Latest runs per test set", body = Vec<TestRunResponse>)
    )
)]
pub async fn last_test_runs(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let cluster_id = path.into_inner();
    let runs: Vec<TestRunResponse> = pool
        .last_test_runs_for_cluster(cluster_id)
        .await?
        .into_iter()
        .map(TestRunResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(runs))
}

/// Start test runs.
///
/// Every test set and its driver are resolved before any run starts, so an
/// unknown test set or driver starts nothing. Requests for a test set that is
/// already running on the cluster, or that does not apply to it, are skipped;
/// only the runs actually started are returned. A runner that fails to launch
/// fails the request after earlier runs of the batch have started.
#[utoipa::path(
    post,
    path = "/api/v1/testruns",
    tag = "Test Runs",
    request_body = Vec<StartTestRunRequest>,
    params(("X-Auth-Token" = Option<String>, Header, description = "Cloud auth token for the runner")),
    responses(
        (status = 200, description = "Started test runs", body = Vec<TestRunResponse>),
        (status = 400, description = "Unknown driver", body = crate::error::ErrorResponse),
        (status = 404, description = "Test set not found", body = crate::error::ErrorResponse),
        (status = 502, description = "Runner failed to start", body = crate::error::ErrorResponse)
    )
)]
pub async fn start_test_runs(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    tracker: web::Data<RunTracker>,
    body: web::Json<Vec<StartTestRunRequest>>,
) -> AppResult<HttpResponse> {
    let token = auth_token(&req);

    let mut resolved = Vec::new();
    for request in body.into_inner() {
        let test_set = pool
            .get_test_set(&request.testset)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test set {}", request.testset)))?;
        tracker.check_driver(&test_set)?;
        resolved.push((test_set, request));
    }

    let mut started = Vec::new();
    for (test_set, request) in resolved {
        let metadata = request.metadata;
        let options = RunOptions {
            credentials: metadata.ostf_os_access_creds,
            token: token.clone().map(SecretString::from),
        };

        if let Some(detail) = tracker
            .start(
                &test_set,
                metadata.cluster_id,
                &request.tests,
                metadata.config,
                options,
            )
            .await?
        {
            started.push(TestRunResponse::from(detail));
        }
    }

    Ok(HttpResponse::Ok().json(started))
}

/// Stop or restart test runs.
#[utoipa::path(
    put,
    path = "/api/v1/testruns",
    tag = "Test Runs",
    request_body = Vec<UpdateTestRunRequest>,
    params(("X-Auth-Token" = Option<String>, Header, description = "Cloud auth token for the runner")),
    responses(
        (status = 200, description = "Updated test runs", body = Vec<TestRunResponse>),
        (status = 404, description = "Test run not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_test_runs(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    tracker: web::Data<RunTracker>,
    body: web::Json<Vec<UpdateTestRunRequest>>,
) -> AppResult<HttpResponse> {
    let token = auth_token(&req);
    let mut updated = Vec::new();

    for request in body.into_inner() {
        let run = pool
            .get_test_run(request.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test run {}", request.id)))?;

        match request.status {
            TestRunAction::Stopped => {
                let detail = tracker.stop(&run).await?;
                updated.push(TestRunResponse::from(detail));
            }
            TestRunAction::Restarted => {
                let options = RunOptions {
                    credentials: request.ostf_os_access_creds,
                    token: token.clone().map(SecretString::from),
                };
                if let Some(detail) = tracker.restart(&run, &request.tests, options).await? {
                    updated.push(TestRunResponse::from(detail));
                }
            }
        }
    }

    Ok(HttpResponse::Ok().json(updated))
}

/// Path parameters for a single test of a run.
#[derive(Debug, Deserialize)]
pub struct RunTestPath {
    pub id: i32,
    pub name: String,
}

/// Record the result of one test, as reported by the runner.
#[utoipa::path(
    put,
    path = "/api/v1/testruns/{id}/tests/{name}",
    tag = "Test Runs",
    params(
        ("id" = i32, Path, description = "Test run ID"),
        ("name" = String, Path, description = "Test name")
    ),
    request_body = TestResultUpdate,
    responses(
        (status = 200, description = "Updated test", body = TestResponse),
        (status = 404, description = "Test not found in run", body = crate::error::ErrorResponse)
    )
)]
pub async fn record_test_result(
    tracker: web::Data<RunTracker>,
    path: web::Path<RunTestPath>,
    body: web::Json<TestResultUpdate>,
) -> AppResult<HttpResponse> {
    let RunTestPath { id, name } = path.into_inner();
    let row = tracker.record_result(id, &name, &body).await?;

    Ok(HttpResponse::Ok().json(TestResponse::from(row)))
}

/// Configure test run routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/testruns")
            .route(web::get().to(list_test_runs))
            .route(web::post().to(start_test_runs))
            .route(web::put().to(update_test_runs)),
    )
    .service(web::resource("/testruns/last/{cluster_id}").route(web::get().to(last_test_runs)))
    .service(web::resource("/testruns/{id}").route(web::get().to(get_test_run)))
    .service(
        web::resource("/testruns/{id}/tests/{name}").route(web::put().to(record_test_result)),
    );
}
