//! API endpoint modules.

pub mod health;
pub mod openapi;
pub mod test_runs;
pub mod test_sets;

pub use health::configure_health_routes;
pub use openapi::ApiDoc;
pub use test_runs::configure_routes as configure_test_run_routes;
pub use test_sets::configure_routes as configure_test_set_routes;
