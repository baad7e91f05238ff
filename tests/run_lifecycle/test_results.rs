//! Recording results and finishing runs.

use ostf_adapter_lib::error::AppError;
use ostf_adapter_lib::models::{TestResultUpdate, TestRunStatus, TestStatus};

use super::test_helpers::*;

fn failure(message: &str) -> TestResultUpdate {
    TestResultUpdate {
        status: TestStatus::Failure,
        message: Some(message.to_string()),
        traceback: Some("Traceback (most recent call last): ...".to_string()),
        step: Some(2),
        time_taken: Some(12.0),
    }
}

fn success() -> TestResultUpdate {
    TestResultUpdate {
        status: TestStatus::Success,
        message: None,
        traceback: None,
        step: None,
        time_taken: Some(3.25),
    }
}

/// A result updates only the named row of the run.
#[actix_rt::test]
async fn test_record_result_updates_row() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());
    let detail = start_run(&tracker, "sanity", 5, &[]).await;

    let row = tracker
        .record_result(detail.run.id, SANITY_B, &failure("Keystone unreachable"))
        .await
        .unwrap();

    assert_eq!(row.name, SANITY_B);
    assert_eq!(row.status.as_deref(), Some("failure"));
    assert_eq!(row.message.as_deref(), Some("Keystone unreachable"));
    assert_eq!(row.step, Some(2));
    assert_eq!(row.time_taken, Some(12.0));

    let after = reload(&db.pool, detail.run.id).await;
    assert_eq!(after.status(), Some(TestRunStatus::Running));
    assert_eq!(status_of(&after, SANITY_A), Some(TestStatus::WaitRunning));
}

/// Results for one run never leak into another run of the same set.
#[actix_rt::test]
async fn test_record_result_is_scoped_to_run() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());
    let on_five = start_run(&tracker, "sanity", 5, &[]).await;
    let on_six = start_run(&tracker, "sanity", 6, &[]).await;

    tracker
        .record_result(on_five.run.id, SANITY_A, &success())
        .await
        .unwrap();

    let untouched = reload(&db.pool, on_six.run.id).await;
    assert_eq!(status_of(&untouched, SANITY_A), Some(TestStatus::WaitRunning));
}

/// The last pending result finishes the run.
#[actix_rt::test]
async fn test_last_result_finishes_run() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());
    let detail = start_run(&tracker, "sanity", 5, &[SANITY_A, SANITY_C]).await;

    tracker
        .record_result(detail.run.id, SANITY_A, &success())
        .await
        .unwrap();
    assert_eq!(
        reload(&db.pool, detail.run.id).await.status(),
        Some(TestRunStatus::Running)
    );

    tracker
        .record_result(detail.run.id, SANITY_C, &failure("timeout"))
        .await
        .unwrap();

    let after = reload(&db.pool, detail.run.id).await;
    assert_eq!(after.status(), Some(TestRunStatus::Finished));
    assert!(after.run.ended_at.is_some());
    assert_eq!(status_of(&after, SANITY_B), Some(TestStatus::Disabled));
}

/// Unknown test names are reported as not found.
#[actix_rt::test]
async fn test_record_result_unknown_test() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());
    let detail = start_run(&tracker, "sanity", 5, &[]).await;

    let result = tracker
        .record_result(detail.run.id, "fuel_health.tests.sanity.test_missing", &success())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

/// A runner exit stops leftover tests and finishes the run once.
#[actix_rt::test]
async fn test_finish_stops_leftover_tests() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());
    let detail = start_run(&tracker, "sanity", 5, &[SANITY_A, SANITY_B]).await;

    tracker
        .record_result(detail.run.id, SANITY_A, &success())
        .await
        .unwrap();

    assert!(tracker.finish(detail.run.id).await.unwrap());
    assert!(!tracker.finish(detail.run.id).await.unwrap());

    let after = reload(&db.pool, detail.run.id).await;
    assert_eq!(after.status(), Some(TestRunStatus::Finished));
    assert_eq!(status_of(&after, SANITY_A), Some(TestStatus::Success));
    assert_eq!(status_of(&after, SANITY_B), Some(TestStatus::Stopped));
    assert_eq!(status_of(&after, SANITY_C), Some(TestStatus::Disabled));
}

/// A stopped run stays stopped when its runner exits afterwards.
#[actix_rt::test]
async fn test_finish_leaves_stopped_run() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());
    let detail = start_run(&tracker, "sanity", 5, &[]).await;

    tracker.stop(&detail.run).await.unwrap();

    assert!(!tracker.finish(detail.run.id).await.unwrap());
    assert_eq!(
        reload(&db.pool, detail.run.id).await.status(),
        Some(TestRunStatus::Stopped)
    );
}

/// Latest runs per test set for a cluster.
#[actix_rt::test]
async fn test_last_runs_per_cluster() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());

    let first = start_run(&tracker, "sanity", 5, &[]).await;
    tracker.finish(first.run.id).await.unwrap();
    let second = start_run(&tracker, "sanity", 5, &[]).await;
    let smoke = start_run(&tracker, "smoke", 5, &[]).await;
    start_run(&tracker, "sanity", 6, &[]).await;

    let mut ids: Vec<i32> = db
        .pool
        .last_test_runs_for_cluster(5)
        .await
        .unwrap()
        .iter()
        .map(|d| d.run.id)
        .collect();
    ids.sort_unstable();

    let mut expected = vec![second.run.id, smoke.run.id];
    expected.sort_unstable();
    assert_eq!(ids, expected);
}
