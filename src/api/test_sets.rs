//! Test set, test and cluster registration handlers.

use actix_web::{HttpResponse, web};

use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::{RegisterClusterRequest, RegisterClusterResponse, TestResponse, TestSetResponse};
use crate::services::discovery;

/// Register a cluster and compute the test sets that apply to it.
#[utoipa::path(
    post,
    path = "/api/v1/clusters",
    tag = "Clusters",
    request_body = RegisterClusterRequest,
    responses(
        (status = 200, description = "Cluster registered", body = RegisterClusterResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_cluster(
    pool: web::Data<DbPool>,
    body: web::Json<RegisterClusterRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let response =
        discovery::register_cluster(&pool, req.cluster_id, req.deployment_tags, req.release_version)
            .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// Test sets applicable to a cluster, in run order.
#[utoipa::path(
    get,
    path = "/api/v1/testsets/{cluster_id}",
    tag = "Test Sets",
    params(("cluster_id" = i32, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Applicable test sets", body = Vec<TestSetResponse>)
    )
)]
pub async fn list_test_sets(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let cluster_id = path.into_inner();
    let test_sets: Vec<TestSetResponse> = pool
        .test_sets_for_cluster(cluster_id)
        .await?
        .into_iter()
        .map(TestSetResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(test_sets))
}

/// Tests applicable to a cluster.
#[utoipa::path(
    get,
    path = "/api/v1/tests/{cluster_id}",
    tag = "Test Sets",
    params(("cluster_id" = i32, Path, description = "Cluster ID")),
    responses(
        (status = 200, description = "Applicable tests", body = Vec<TestResponse>)
    )
)]
pub async fn list_tests(pool: web::Data<DbPool>, path: web::Path<i32>) -> AppResult<HttpResponse> {
    let cluster_id = path.into_inner();
    let tests: Vec<TestResponse> = pool
        .template_tests_for_cluster(cluster_id)
        .await?
        .into_iter()
        .map(TestResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(tests))
}

/// Configure test set and cluster routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/clusters").route(web::post().to(register_cluster)))
        .service(web::resource("/testsets/{cluster_id}").route(web::get().to(list_test_sets)))
        .service(web::resource("/tests/{cluster_id}").route(web::get().to(list_tests)));
}
