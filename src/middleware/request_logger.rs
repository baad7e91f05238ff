//! Request logging middleware for API request/response logging.

use actix_web::Error;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready};
use actix_web::http::StatusCode;
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::api::test_runs::AUTH_TOKEN_HEADER;

/// Request logger middleware factory.
pub struct RequestLogger;

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware { service }))
    }
}

/// Request logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let remote_addr = req
            .connection_info()
            .realip_remote_addr()
            .unwrap_or("unknown")
            .to_string();

        // Only presence is logged, never the token.
        let has_token = req.headers().contains_key(AUTH_TOKEN_HEADER);

        info!(
            target: "api",
            method = %method,
            path = %path,
            remote_addr = %remote_addr,
            auth_token = has_token,
            "→ Request started"
        );

        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            log_completion(&method, &path, res.status(), start.elapsed());
            Ok(res)
        })
    }
}

fn log_completion(method: &str, path: &str, status: StatusCode, elapsed: Duration) {
    let status_code = status.as_u16();
    let duration_ms = elapsed.as_millis();

    if status.is_success() {
        info!(
            target: "api",
            method = %method,
            path = %path,
            status = %status_code,
            duration_ms = %duration_ms,
            "← Request completed"
        );
    } else if status.is_client_error() {
        warn!(
            target: "api",
            method = %method,
            path = %path,
            status = %status_code,
            duration_ms = %duration_ms,
            "← Client error"
        );
    } else {
        warn!(
            target: "api",
            method = %method,
            path = %path,
            status = %status_code,
            duration_ms = %duration_ms,
            "← Server error"
        );
    }
}
