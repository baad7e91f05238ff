//! Stopping runs.

use ostf_adapter_lib::models::{TestResultUpdate, TestRunStatus, TestStatus};

use super::test_helpers::*;

/// A successful kill stops the run and its pending tests.
#[actix_rt::test]
async fn test_stop_marks_pending_tests_stopped() {
    let db = create_test_db().await;
    let driver = FakeDriver::new();
    let tracker = create_tracker(&db.pool, driver.clone());

    let detail = start_run(&tracker, "sanity", 5, &[SANITY_A, SANITY_B]).await;
    tracker
        .record_result(
            detail.run.id,
            SANITY_A,
            &TestResultUpdate {
                status: TestStatus::Success,
                message: None,
                traceback: None,
                step: None,
                time_taken: Some(0.4),
            },
        )
        .await
        .unwrap();

    let stopped = tracker.stop(&detail.run).await.unwrap();

    assert_eq!(driver.kills(), vec![detail.run.id]);
    assert_eq!(stopped.status(), Some(TestRunStatus::Stopped));
    assert!(stopped.run.ended_at.is_some());
    assert_eq!(status_of(&stopped, SANITY_A), Some(TestStatus::Success));
    assert_eq!(status_of(&stopped, SANITY_B), Some(TestStatus::Stopped));
    assert_eq!(status_of(&stopped, SANITY_C), Some(TestStatus::Disabled));
}

/// A stopped run no longer blocks new starts.
#[actix_rt::test]
async fn test_start_after_stop() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());

    let detail = start_run(&tracker, "sanity", 5, &[]).await;
    tracker.stop(&detail.run).await.unwrap();

    let next = try_start_run(&tracker, "sanity", 5, &[]).await;
    assert!(next.is_some_and(|d| d.run.id != detail.run.id));
}

/// When the runner cannot be killed nothing changes.
#[actix_rt::test]
async fn test_stop_with_failed_kill_changes_nothing() {
    let db = create_test_db().await;
    let driver = FakeDriver::new();
    let tracker = create_tracker(&db.pool, driver.clone());

    let detail = start_run(&tracker, "sanity", 5, &[]).await;
    driver.refuse_kills(true);

    let after = tracker.stop(&detail.run).await.unwrap();

    assert_eq!(after.status(), Some(TestRunStatus::Running));
    assert!(after.run.ended_at.is_none());
    assert!(
        after
            .tests
            .iter()
            .all(|t| t.status.as_deref() == Some("wait_running"))
    );
    assert!(try_start_run(&tracker, "sanity", 5, &[]).await.is_none());
}
