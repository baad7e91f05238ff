//! Restarting finished and stopped runs.

use ostf_adapter_lib::models::{TestResultUpdate, TestRunStatus, TestStatus};
use ostf_adapter_lib::services::RunOptions;

use super::test_helpers::*;

fn result(status: TestStatus, time_taken: f64) -> TestResultUpdate {
    TestResultUpdate {
        status,
        message: None,
        traceback: None,
        step: None,
        time_taken: Some(time_taken),
    }
}

/// An active run cannot be restarted.
#[actix_rt::test]
async fn test_restart_active_run_is_refused() {
    let db = create_test_db().await;
    let driver = FakeDriver::new();
    let tracker = create_tracker(&db.pool, driver.clone());

    let detail = start_run(&tracker, "sanity", 5, &[]).await;
    let restarted = tracker
        .restart(&detail.run, &[], RunOptions::default())
        .await
        .unwrap();

    assert!(restarted.is_none());
    assert_eq!(driver.runs().len(), 1);
}

/// Restarting selected tests requeues only those rows.
#[actix_rt::test]
async fn test_restart_selected_tests() {
    let db = create_test_db().await;
    let driver = FakeDriver::new();
    let tracker = create_tracker(&db.pool, driver.clone());

    let detail = start_run(&tracker, "sanity", 5, &[SANITY_A, SANITY_B]).await;
    let run_id = detail.run.id;
    tracker
        .record_result(run_id, SANITY_A, &result(TestStatus::Success, 1.5))
        .await
        .unwrap();
    tracker
        .record_result(run_id, SANITY_B, &result(TestStatus::Failure, 2.5))
        .await
        .unwrap();

    let finished = reload(&db.pool, run_id).await;
    assert_eq!(finished.status(), Some(TestRunStatus::Finished));
    assert!(finished.run.ended_at.is_some());

    let restarted = tracker
        .restart(&finished.run, &[SANITY_B.to_string()], RunOptions::default())
        .await
        .unwrap()
        .expect("finished run should restart");

    assert_eq!(restarted.run.id, run_id);
    assert_eq!(restarted.status(), Some(TestRunStatus::Running));
    assert!(restarted.run.ended_at.is_none());

    let b = restarted.test(SANITY_B).unwrap();
    assert_eq!(b.status.as_deref(), Some("wait_running"));
    assert!(b.time_taken.is_none());

    let a = restarted.test(SANITY_A).unwrap();
    assert_eq!(a.status.as_deref(), Some("success"));
    assert_eq!(a.time_taken, Some(1.5));
    assert_eq!(status_of(&restarted, SANITY_C), Some(TestStatus::Disabled));

    let recorded = driver.last_run();
    assert_eq!(recorded.run_id, run_id);
    assert_eq!(recorded.tests, vec![SANITY_B]);
}

/// Restarting without a selection queues every enabled test again.
#[actix_rt::test]
async fn test_restart_without_selection_requeues_enabled_tests() {
    let db = create_test_db().await;
    let driver = FakeDriver::new();
    let tracker = create_tracker(&db.pool, driver.clone());

    let detail = start_run(&tracker, "sanity", 5, &[SANITY_A, SANITY_B]).await;
    tracker
        .record_result(detail.run.id, SANITY_A, &result(TestStatus::Success, 1.5))
        .await
        .unwrap();
    tracker.finish(detail.run.id).await.unwrap();
    let before = reload(&db.pool, detail.run.id).await;
    assert_eq!(status_of(&before, SANITY_B), Some(TestStatus::Stopped));

    let restarted = tracker
        .restart(&before.run, &[], RunOptions::default())
        .await
        .unwrap()
        .expect("finished run should restart");

    assert_eq!(restarted.status(), Some(TestRunStatus::Running));
    assert_eq!(status_of(&restarted, SANITY_A), Some(TestStatus::WaitRunning));
    assert_eq!(status_of(&restarted, SANITY_B), Some(TestStatus::WaitRunning));
    assert_eq!(status_of(&restarted, SANITY_C), Some(TestStatus::Disabled));
    assert!(restarted.test(SANITY_A).unwrap().time_taken.is_none());
    assert_eq!(driver.last_run().tests, vec![SANITY_A, SANITY_B]);
}

/// A full restart stays active until every requeued test reports.
#[actix_rt::test]
async fn test_restart_without_selection_stays_active_until_all_report() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());

    let detail = start_run(&tracker, "sanity", 5, &[]).await;
    let run_id = detail.run.id;
    for name in [SANITY_A, SANITY_B, SANITY_C] {
        tracker
            .record_result(run_id, name, &result(TestStatus::Success, 1.0))
            .await
            .unwrap();
    }
    let finished = reload(&db.pool, run_id).await;
    assert_eq!(finished.status(), Some(TestRunStatus::Finished));

    tracker
        .restart(&finished.run, &[], RunOptions::default())
        .await
        .unwrap()
        .expect("finished run should restart");
    tracker
        .record_result(run_id, SANITY_A, &result(TestStatus::Success, 1.0))
        .await
        .unwrap();

    assert_eq!(
        reload(&db.pool, run_id).await.status(),
        Some(TestRunStatus::Running)
    );
    assert!(try_start_run(&tracker, "sanity", 5, &[]).await.is_none());

    for name in [SANITY_B, SANITY_C] {
        tracker
            .record_result(run_id, name, &result(TestStatus::Success, 1.0))
            .await
            .unwrap();
    }
    assert_eq!(
        reload(&db.pool, run_id).await.status(),
        Some(TestRunStatus::Finished)
    );
}

/// A stopped run can be restarted.
#[actix_rt::test]
async fn test_restart_stopped_run() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());

    let detail = start_run(&tracker, "sanity", 5, &[]).await;
    let stopped = tracker.stop(&detail.run).await.unwrap();
    assert_eq!(stopped.status(), Some(TestRunStatus::Stopped));

    let restarted = tracker
        .restart(&stopped.run, &[SANITY_C.to_string()], RunOptions::default())
        .await
        .unwrap()
        .expect("stopped run should restart");

    assert_eq!(restarted.status(), Some(TestRunStatus::Running));
    assert_eq!(status_of(&restarted, SANITY_C), Some(TestStatus::WaitRunning));
    assert_eq!(status_of(&restarted, SANITY_A), Some(TestStatus::Stopped));
}

/// An older run cannot be revived while a newer one is active.
#[actix_rt::test]
async fn test_restart_blocked_by_newer_active_run() {
    let db = create_test_db().await;
    let tracker = create_tracker(&db.pool, FakeDriver::new());

    let first = start_run(&tracker, "sanity", 5, &[]).await;
    tracker.finish(first.run.id).await.unwrap();
    start_run(&tracker, "sanity", 5, &[]).await;

    let old = reload(&db.pool, first.run.id).await;
    let restarted = tracker
        .restart(&old.run, &[], RunOptions::default())
        .await
        .unwrap();

    assert!(restarted.is_none());
    assert_eq!(
        reload(&db.pool, first.run.id).await.status(),
        Some(TestRunStatus::Finished)
    );
}

/// A driver failure on restart leaves the run stopped.
#[actix_rt::test]
async fn test_restart_driver_failure_stops_run() {
    let db = create_test_db().await;
    let driver = FakeDriver::new();
    let tracker = create_tracker(&db.pool, driver.clone());

    let detail = start_run(&tracker, "sanity", 5, &[]).await;
    tracker.finish(detail.run.id).await.unwrap();

    driver.fail_runs(true);
    let finished = reload(&db.pool, detail.run.id).await;
    let result = tracker
        .restart(&finished.run, &[SANITY_A.to_string()], RunOptions::default())
        .await;

    assert!(result.is_err());
    let after = reload(&db.pool, detail.run.id).await;
    assert_eq!(after.status(), Some(TestRunStatus::Stopped));
    assert_eq!(status_of(&after, SANITY_A), Some(TestStatus::Stopped));
}
