//! Database queries for test runs.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::Value as JsonValue;

use crate::entity::test;
use crate::entity::test_run::{self, ActiveModel, Entity as TestRun};
use crate::error::{AppError, AppResult};
use crate::models::{TestRunDetail, TestRunStatus, TestStatus};

use super::{DbPool, tests};

impl DbPool {
    /// Get a test run by ID.
    pub async fn get_test_run(&self, id: i32) -> AppResult<Option<test_run::Model>> {
        let result = TestRun::find_by_id(id)
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get test run: {}", e)))?;

        Ok(result)
    }

    /// Get a test run with its tests.
    pub async fn get_test_run_detail(&self, id: i32) -> AppResult<Option<TestRunDetail>> {
        let Some(run) = self.get_test_run(id).await? else {
            return Ok(None);
        };
        let tests = tests::tests_for_run(self.connection(), id).await?;

        Ok(Some(TestRunDetail { run, tests }))
    }

    /// All test runs with their tests, newest first.
    pub async fn list_test_runs(&self) -> AppResult<Vec<TestRunDetail>> {
        let runs = TestRun::find()
            .order_by_desc(test_run::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list test runs: {}", e)))?;

        self.attach_tests(runs).await
    }

    /// The most recent run of every test set on a cluster.
    pub async fn last_test_runs_for_cluster(&self, cluster_id: i32) -> AppResult<Vec<TestRunDetail>> {
        let runs = TestRun::find()
            .filter(test_run::Column::ClusterId.eq(cluster_id))
            .order_by_desc(test_run::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get cluster test runs: {}", e)))?;

        let mut seen = std::collections::HashSet::new();
        let latest: Vec<test_run::Model> = runs
            .into_iter()
            .filter(|run| seen.insert(run.test_set_id.clone()))
            .collect();

        self.attach_tests(latest).await
    }

    /// Record the pid of the runner process serving a run.
    pub async fn set_test_run_pid(&self, id: i32, pid: i32) -> AppResult<()> {
        TestRun::update_many()
            .col_expr(test_run::Column::Pid, Expr::value(pid))
            .filter(test_run::Column::Id.eq(id))
            .exec(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to set test run pid: {}", e)))?;

        Ok(())
    }

    /// Mark a run stopped and every pending test of it `stopped`.
    pub async fn stop_test_run(&self, id: i32) -> AppResult<()> {
        let txn = self.connection().begin().await?;
        tests::update_running_tests(&txn, id, TestStatus::Stopped).await?;
        update_test_run_status(&txn, id, TestRunStatus::Stopped).await?;
        txn.commit().await?;

        Ok(())
    }

    /// Close a run whose runner exited on its own.
    ///
    /// Tests the runner never reported become `stopped`; runs that are
    /// already finished or stopped are left alone. Returns whether the run
    /// was closed by this call.
    pub async fn finish_test_run(&self, id: i32) -> AppResult<bool> {
        let txn = self.connection().begin().await?;
        let finished = finish_if_active(&txn, id).await?;
        txn.commit().await?;

        Ok(finished)
    }

    async fn attach_tests(&self, runs: Vec<test_run::Model>) -> AppResult<Vec<TestRunDetail>> {
        if runs.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = runs.iter().map(|r| r.id).collect();
        let rows = test::Entity::find()
            .filter(test::Column::TestRunId.is_in(ids))
            .order_by_asc(test::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get tests for runs: {}", e)))?;

        let mut by_run: HashMap<i32, Vec<test::Model>> = HashMap::new();
        for row in rows {
            if let Some(run_id) = row.test_run_id {
                by_run.entry(run_id).or_default().push(row);
            }
        }

        Ok(runs
            .into_iter()
            .map(|run| {
                let tests = by_run.remove(&run.id).unwrap_or_default();
                TestRunDetail { run, tests }
            })
            .collect())
    }
}

/// Most recent run of a test set on a cluster.
pub async fn get_last_test_run<C: ConnectionTrait>(
    conn: &C,
    test_set_id: &str,
    cluster_id: i32,
) -> AppResult<Option<test_run::Model>> {
    let result = TestRun::find()
        .filter(test_run::Column::TestSetId.eq(test_set_id))
        .filter(test_run::Column::ClusterId.eq(cluster_id))
        .order_by_desc(test_run::Column::Id)
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get last test run: {}", e)))?;

    Ok(result)
}

/// Whether the latest run of a test set on a cluster is still active.
///
/// No prior run, or a finished or stopped one, means a new run may start.
pub async fn has_active_run<C: ConnectionTrait>(
    conn: &C,
    test_set_id: &str,
    cluster_id: i32,
) -> AppResult<bool> {
    let last = get_last_test_run(conn, test_set_id, cluster_id).await?;

    Ok(last
        .and_then(|run| TestRunStatus::parse(&run.status))
        .is_some_and(|status| status.is_active()))
}

/// Insert a new run.
///
/// Returns the raw `DbErr` so callers can tell a unique-index conflict on
/// the active-run index apart from other failures.
pub async fn insert_test_run<C: ConnectionTrait>(
    conn: &C,
    test_set_id: &str,
    cluster_id: i32,
    status: TestRunStatus,
    meta: Option<JsonValue>,
) -> Result<test_run::Model, DbErr> {
    let model = ActiveModel {
        id: NotSet,
        test_set_id: Set(test_set_id.to_string()),
        cluster_id: Set(cluster_id),
        status: Set(status.as_str().to_string()),
        meta: Set(meta),
        started_at: Set(Utc::now()),
        ended_at: Set(None),
        pid: Set(None),
    };

    model.insert(conn).await
}

/// Finish a run unless it is already finished or stopped.
///
/// Pending tests of the run become `stopped`.
pub async fn finish_if_active<C: ConnectionTrait>(conn: &C, id: i32) -> AppResult<bool> {
    let Some(run) = TestRun::find_by_id(id).one(conn).await? else {
        return Ok(false);
    };
    if !TestRunStatus::parse(&run.status).is_some_and(|s| s.is_active()) {
        return Ok(false);
    }

    tests::update_running_tests(conn, id, TestStatus::Stopped).await?;
    update_test_run_status(conn, id, TestRunStatus::Finished).await?;

    Ok(true)
}

/// Change a run's status.
///
/// Finishing or stopping stamps `ended_at`; reactivating clears it. Returns
/// the raw `DbErr` for the same reason as [`insert_test_run`].
pub async fn update_test_run_status<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    status: TestRunStatus,
) -> Result<(), DbErr> {
    let ended_at = if status.is_active() {
        None
    } else {
        Some(Utc::now())
    };

    TestRun::update_many()
        .col_expr(test_run::Column::Status, Expr::value(status.as_str()))
        .col_expr(test_run::Column::EndedAt, Expr::value(ended_at))
        .filter(test_run::Column::Id.eq(id))
        .exec(conn)
        .await?;

    Ok(())
}
