//! Test run lifecycle: start, restart, stop, result recording and finish.
//!
//! At most one run per (test set, cluster) may be active. Start and restart
//! take a per-pair lock for the duration of the check and the write, and the
//! `idx_test_runs_active` unique index rejects anything that slips past it
//! from another process. A rejected start or restart returns `None`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use serde_json::Value as JsonValue;
use sea_orm::TransactionTrait;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, error, info, warn};

use crate::db::tests as run_tests;
use crate::db::{self, DbPool, clusters, test_runs, test_sets};
use crate::entity::{test, test_run, test_set};
use crate::error::{AppError, AppResult};
use crate::models::test_run::enabled_test_names;
use crate::models::{OsAccessCredentials, TestResultUpdate, TestRunDetail, TestRunStatus, TestStatus};
use crate::services::dispatcher::{DriverRegistry, RunRequest, TestDriver};

type RunKey = (String, i32);
type LockMap = HashMap<RunKey, Arc<tokio::sync::Mutex<()>>>;

/// Async locks keyed by (test set id, cluster id).
///
/// Entries live only while some caller holds or waits for the lock.
#[derive(Default)]
pub struct RunLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive access to one (test set, cluster) pair, released on drop.
pub struct RunGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: RunKey,
    locks: Arc<Mutex<LockMap>>,
}

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a (test set, cluster) pair.
    pub async fn acquire(&self, test_set_id: &str, cluster_id: i32) -> RunGuard {
        let key = (test_set_id.to_string(), cluster_id);
        let lock = Arc::clone(lock_map(&self.locks).entry(key.clone()).or_default());

        RunGuard {
            guard: Some(lock.lock_owned().await),
            key,
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        lock_map(&self.locks).len()
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = lock_map(&self.locks);
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

fn lock_map(locks: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    locks.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-call runner inputs that are never stored.
#[derive(Debug, Default)]
pub struct RunOptions {
    pub credentials: Option<OsAccessCredentials>,
    pub token: Option<SecretString>,
}

/// Tracks test runs and hands them to drivers.
pub struct RunTracker {
    pool: DbPool,
    drivers: DriverRegistry,
    locks: RunLocks,
    dbpath: String,
}

impl RunTracker {
    /// `dbpath` is handed to runners so they can report results.
    pub fn new(pool: DbPool, drivers: DriverRegistry, dbpath: impl Into<String>) -> Self {
        Self {
            pool,
            drivers,
            locks: RunLocks::new(),
            dbpath: dbpath.into(),
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Fail with `InvalidInput` when no driver serves the test set.
    pub fn check_driver(&self, test_set: &test_set::Model) -> AppResult<()> {
        self.drivers.get(&test_set.driver).map(|_| ())
    }

    /// Start a run of `test_set` on a cluster.
    ///
    /// `tests` selects the tests to execute; empty means all. Returns `None`
    /// without side effects when the pair, or an exclusive test set on the
    /// same cluster, already has an active run, or when the cluster is
    /// registered and the test set does not apply to it.
    pub async fn start(
        &self,
        test_set: &test_set::Model,
        cluster_id: i32,
        tests: &[String],
        meta: Option<JsonValue>,
        options: RunOptions,
    ) -> AppResult<Option<TestRunDetail>> {
        let driver = self.drivers.get(&test_set.driver)?;
        let _guard = self.locks.acquire(&test_set.id, cluster_id).await;

        let txn = self.pool.connection().begin().await?;

        if test_runs::has_active_run(&txn, &test_set.id, cluster_id).await? {
            info!(
                "Test set {} already running on cluster {}",
                test_set.id, cluster_id
            );
            return Ok(None);
        }

        for exclusive in test_set.exclusive_testsets.iter() {
            if test_runs::has_active_run(&txn, exclusive, cluster_id).await? {
                info!(
                    "Test set {} blocked on cluster {} by exclusive test set {}",
                    test_set.id, cluster_id, exclusive
                );
                return Ok(None);
            }
        }

        let pattern = clusters::get_testing_pattern(&txn, cluster_id, &test_set.id).await?;
        if pattern.is_none() && clusters::get_cluster_state(&txn, cluster_id).await?.is_some() {
            info!(
                "Test set {} does not apply to registered cluster {}",
                test_set.id, cluster_id
            );
            return Ok(None);
        }

        let templates =
            test_sets::template_tests(&txn, &test_set.id, pattern.as_ref().map(|p| &p.tests))
                .await?;

        let run = match test_runs::insert_test_run(
            &txn,
            &test_set.id,
            cluster_id,
            TestRunStatus::Running,
            meta,
        )
        .await
        {
            Ok(run) => run,
            Err(e) if db::is_unique_violation(&e) => {
                info!(
                    "Concurrent start of test set {} on cluster {} rejected",
                    test_set.id, cluster_id
                );
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        run_tests::clone_template_tests(&txn, run.id, &templates, tests).await?;
        txn.commit().await?;

        let detail = TestRunDetail {
            tests: run_tests::tests_for_run(self.pool.connection(), run.id).await?,
            run,
        };

        info!(
            "Started test run {} (test set: {}, cluster: {}, tests: {})",
            detail.run.id,
            test_set.id,
            cluster_id,
            detail.tests.len()
        );

        let enabled = detail.enabled_tests();
        self.dispatch(driver.as_ref(), &detail, test_set.clone(), enabled, options)
            .await?;

        Ok(Some(detail))
    }

    /// Re-activate a finished or stopped run.
    ///
    /// The named `tests`, or every enabled test when `tests` is empty, are
    /// queued again with their timing cleared; other rows keep their results.
    /// Returns `None` when the pair has an active run.
    pub async fn restart(
        &self,
        test_run: &test_run::Model,
        tests: &[String],
        options: RunOptions,
    ) -> AppResult<Option<TestRunDetail>> {
        let test_set = self.test_set_of(test_run).await?;
        let driver = self.drivers.get(&test_set.driver)?;
        let _guard = self
            .locks
            .acquire(&test_run.test_set_id, test_run.cluster_id)
            .await;

        let txn = self.pool.connection().begin().await?;

        if test_runs::has_active_run(&txn, &test_run.test_set_id, test_run.cluster_id).await? {
            info!(
                "Test set {} already running on cluster {}, not restarting run {}",
                test_run.test_set_id, test_run.cluster_id, test_run.id
            );
            return Ok(None);
        }

        let selected = if tests.is_empty() {
            enabled_test_names(&run_tests::tests_for_run(&txn, test_run.id).await?)
        } else {
            tests.to_vec()
        };
        run_tests::update_test_run_tests(&txn, test_run.id, &selected, TestStatus::WaitRunning)
            .await?;

        match test_runs::update_test_run_status(&txn, test_run.id, TestRunStatus::Running).await {
            Ok(()) => {}
            Err(e) if db::is_unique_violation(&e) => {
                info!("Concurrent restart of test run {} rejected", test_run.id);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }

        txn.commit().await?;

        let detail = self
            .pool
            .get_test_run_detail(test_run.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test run {}", test_run.id)))?;

        info!(
            "Restarted test run {} (test set: {}, cluster: {})",
            test_run.id, test_run.test_set_id, test_run.cluster_id
        );

        self.dispatch(driver.as_ref(), &detail, test_set, selected, options)
            .await?;

        Ok(Some(detail))
    }

    /// Kill the runner of a run and mark it stopped.
    ///
    /// When the driver cannot kill the runner nothing changes.
    pub async fn stop(&self, test_run: &test_run::Model) -> AppResult<TestRunDetail> {
        let test_set = self.test_set_of(test_run).await?;
        let driver = self.drivers.get(&test_set.driver)?;

        if driver.kill(test_run).await {
            self.pool.stop_test_run(test_run.id).await?;
            info!(
                "Stopped test run {} (test set: {}, cluster: {})",
                test_run.id, test_run.test_set_id, test_run.cluster_id
            );
        } else {
            warn!("Runner of test run {} could not be killed", test_run.id);
        }

        self.pool
            .get_test_run_detail(test_run.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test run {}", test_run.id)))
    }

    /// Apply a runner-reported result to one test of a run.
    ///
    /// The run finishes once none of its tests is queued or executing.
    pub async fn record_result(
        &self,
        test_run_id: i32,
        test_name: &str,
        result: &TestResultUpdate,
    ) -> AppResult<test::Model> {
        let txn = self.pool.connection().begin().await?;

        if run_tests::add_result(&txn, test_run_id, test_name, result).await? == 0 {
            return Err(AppError::NotFound(format!(
                "Test {} in test run {}",
                test_name, test_run_id
            )));
        }

        debug!(
            "Test {} of run {} reported {}",
            test_name, test_run_id, result.status
        );

        if run_tests::count_pending_tests(&txn, test_run_id).await? == 0
            && test_runs::finish_if_active(&txn, test_run_id).await?
        {
            info!("Test run {} finished, all tests reported", test_run_id);
        }

        let row = run_tests::get_run_test(&txn, test_run_id, test_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Test {} in test run {}", test_name, test_run_id))
            })?;

        txn.commit().await?;

        Ok(row)
    }

    /// Close a run whose runner exited on its own.
    pub async fn finish(&self, test_run_id: i32) -> AppResult<bool> {
        let finished = self.pool.finish_test_run(test_run_id).await?;
        if finished {
            info!("Test run {} finished", test_run_id);
        }

        Ok(finished)
    }

    async fn test_set_of(&self, test_run: &test_run::Model) -> AppResult<test_set::Model> {
        self.pool
            .get_test_set(&test_run.test_set_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test set {}", test_run.test_set_id)))
    }

    /// Hand a committed run to its driver.
    ///
    /// A run whose runner never started is stopped before the error is
    /// returned, so it does not block the pair.
    async fn dispatch(
        &self,
        driver: &dyn TestDriver,
        detail: &TestRunDetail,
        test_set: test_set::Model,
        tests: Vec<String>,
        options: RunOptions,
    ) -> AppResult<()> {
        let request = RunRequest {
            test_run: detail.run.clone(),
            test_set,
            dbpath: self.dbpath.clone(),
            credentials: options.credentials,
            tests,
            token: options.token,
        };

        if let Err(e) = driver.run(request).await {
            error!("Driver failed for test run {}: {}", detail.run.id, e);
            if let Err(stop_err) = self.pool.stop_test_run(detail.run.id).await {
                error!(
                    "Failed to abandon test run {}: {}",
                    detail.run.id, stop_err
                );
            }
            return Err(e.into());
        }

        Ok(())
    }
}
