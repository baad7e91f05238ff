//! External runner processes driven through the tracker.

use std::sync::Arc;
use std::time::Duration;

use ostf_adapter_lib::config::RunnerSettings;
use ostf_adapter_lib::db::DbPool;
use ostf_adapter_lib::error::AppError;
use ostf_adapter_lib::models::{TestRunDetail, TestRunStatus, TestStatus};
use ostf_adapter_lib::services::dispatcher::DriverRegistry;
use ostf_adapter_lib::services::{ProcessDriver, RunOptions, RunTracker, catalog};

use super::test_helpers::*;

const SLEEPER_TEST: &str = "runner.tests.test_sleep";

/// The runner gets the test path as its last argument, so `sleep` waits
/// for 30 seconds and `true` exits at once.
const SLEEPER_CATALOG: &str = r#"{"test_sets": [{
    "id": "sleeper",
    "description": "Runner process tests",
    "test_path": "30",
    "tests": [{"name": "runner.tests.test_sleep", "title": "Sleep"}]
}]}"#;

async fn process_tracker(pool: &DbPool, binary: &str) -> (RunTracker, Arc<ProcessDriver>) {
    let parsed = catalog::parse_catalog(SLEEPER_CATALOG).unwrap();
    catalog::sync_catalog(pool, parsed).await.unwrap();

    let settings = RunnerSettings {
        binary: binary.to_string(),
        work_dir: None,
    };
    let driver = Arc::new(ProcessDriver::new(&settings, pool.clone()));
    let registry = DriverRegistry::new().with_driver("nose", driver.clone());

    (RunTracker::new(pool.clone(), registry, TEST_DBPATH), driver)
}

async fn wait_for_status(pool: &DbPool, run_id: i32, status: TestRunStatus) -> TestRunDetail {
    for _ in 0..100 {
        let detail = reload(pool, run_id).await;
        if detail.status() == Some(status) {
            return detail;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("test run {} never reached {}", run_id, status);
}

/// Stopping kills the runner and closes the run.
#[actix_rt::test]
async fn test_stop_kills_runner() {
    let db = create_test_db().await;
    let (tracker, driver) = process_tracker(&db.pool, "sleep").await;

    let detail = start_run(&tracker, "sleeper", 5, &[]).await;
    assert_eq!(driver.active_sessions(), 1);
    assert!(reload(&db.pool, detail.run.id).await.run.pid.is_some());

    let stopped = tracker.stop(&detail.run).await.unwrap();

    assert_eq!(stopped.status(), Some(TestRunStatus::Stopped));
    assert_eq!(status_of(&stopped, SLEEPER_TEST), Some(TestStatus::Stopped));
    assert_eq!(driver.active_sessions(), 0);
}

/// A runner that exits on its own finishes the run.
#[actix_rt::test]
async fn test_runner_exit_finishes_run() {
    let db = create_test_db().await;
    let (tracker, driver) = process_tracker(&db.pool, "true").await;

    let detail = start_run(&tracker, "sleeper", 5, &[]).await;
    let finished = wait_for_status(&db.pool, detail.run.id, TestRunStatus::Finished).await;

    assert!(finished.run.ended_at.is_some());
    assert_eq!(status_of(&finished, SLEEPER_TEST), Some(TestStatus::Stopped));
    assert_eq!(driver.active_sessions(), 0);
}

/// A runner that cannot be launched leaves the run stopped.
#[actix_rt::test]
async fn test_missing_runner_stops_run() {
    let db = create_test_db().await;
    let (tracker, _driver) = process_tracker(&db.pool, "/nonexistent/ostf-runner").await;
    let test_set = get_test_set(&db.pool, "sleeper").await;

    let result = tracker
        .start(&test_set, 5, &[], None, RunOptions::default())
        .await;
    assert!(matches!(result, Err(AppError::Driver(_))));

    let runs = db.pool.list_test_runs().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status(), Some(TestRunStatus::Stopped));
    assert!(runs[0].run.ended_at.is_some());
}
