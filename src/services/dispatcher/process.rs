//! Driver that runs each test run in an external runner process.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::{DriverError, RunRequest, TestDriver};
use crate::config::RunnerSettings;
use crate::db::DbPool;
use crate::entity::test_run;

/// Kill requests carry a channel for the watcher to report the outcome.
type KillRequest = oneshot::Sender<bool>;

struct Session {
    generation: u64,
    kill_tx: oneshot::Sender<KillRequest>,
}

/// Launches the runner binary with the test set's arguments and path.
///
/// Run details reach the runner through `OSTF_*` and `OS_*` environment
/// variables. A watcher task per process finishes the run when the runner
/// exits on its own.
pub struct ProcessDriver {
    binary: String,
    work_dir: Option<PathBuf>,
    pool: DbPool,
    sessions: Arc<Mutex<HashMap<i32, Session>>>,
    generation: AtomicU64,
}

impl ProcessDriver {
    pub fn new(settings: &RunnerSettings, pool: DbPool) -> Self {
        Self {
            binary: settings.binary.clone(),
            work_dir: settings.work_dir.clone(),
            pool,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            generation: AtomicU64::new(0),
        }
    }

    /// Number of runners currently tracked.
    pub fn active_sessions(&self) -> usize {
        lock_sessions(&self.sessions).len()
    }

    fn command(&self, request: &RunRequest) -> Command {
        let test_set = &request.test_set;
        let mut command = Command::new(&self.binary);

        command
            .args(test_set.additional_arguments.iter())
            .arg(&test_set.test_path)
            .env("OSTF_TEST_RUN_ID", request.test_run.id.to_string())
            .env("OSTF_TEST_SET", &test_set.id)
            .env("OSTF_CLUSTER_ID", request.test_run.cluster_id.to_string())
            .env("OSTF_DBPATH", &request.dbpath)
            .env("OSTF_TESTS", request.tests.join(","))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &self.work_dir {
            command.current_dir(dir);
        }

        if let Some(creds) = &request.credentials {
            command
                .env("OS_USERNAME", &creds.username)
                .env("OS_PASSWORD", creds.password.expose_secret())
                .env("OS_TENANT_NAME", &creds.tenant);
        }

        if let Some(token) = &request.token {
            command.env("OS_AUTH_TOKEN", token.expose_secret());
        }

        command
    }
}

#[async_trait]
impl TestDriver for ProcessDriver {
    async fn run(&self, request: RunRequest) -> Result<(), DriverError> {
        let run_id = request.test_run.id;

        let child = self
            .command(&request)
            .spawn()
            .map_err(|source| DriverError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        let pid = child.id().ok_or(DriverError::MissingPid(run_id))?;

        // Dropping `child` on error kills the runner.
        self.pool
            .set_test_run_pid(run_id, pid as i32)
            .await
            .map_err(|e| DriverError::Store(e.to_string()))?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let (kill_tx, kill_rx) = oneshot::channel::<KillRequest>();
        lock_sessions(&self.sessions).insert(
            run_id,
            Session {
                generation,
                kill_tx,
            },
        );

        info!(
            "Started runner for test run {} (test set: {}, pid: {})",
            run_id, request.test_set.id, pid
        );

        tokio::spawn(watch_runner(
            child,
            kill_rx,
            run_id,
            generation,
            Arc::clone(&self.sessions),
            self.pool.clone(),
        ));

        Ok(())
    }

    async fn kill(&self, test_run: &test_run::Model) -> bool {
        let session = lock_sessions(&self.sessions).remove(&test_run.id);
        let Some(session) = session else {
            warn!("No runner tracked for test run {}", test_run.id);
            return false;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if session.kill_tx.send(reply_tx).is_err() {
            debug!("Runner of test run {} already exited", test_run.id);
            return false;
        }

        reply_rx.await.unwrap_or(false)
    }
}

/// Own a runner until it exits or is killed.
///
/// A failed kill re-tracks the session so the run can be stopped again, and
/// the run is still finished once the process exits.
async fn watch_runner(
    mut child: Child,
    mut kill_rx: oneshot::Receiver<KillRequest>,
    run_id: i32,
    generation: u64,
    sessions: Arc<Mutex<HashMap<i32, Session>>>,
    pool: DbPool,
) {
    let mut accepting_kills = true;

    loop {
        tokio::select! {
            status = child.wait() => {
                match status {
                    Ok(status) => info!("Runner for test run {} exited with {}", run_id, status),
                    Err(e) => warn!("Failed to wait for runner of test run {}: {}", run_id, e),
                }

                if release_session(&sessions, run_id, generation) {
                    match pool.finish_test_run(run_id).await {
                        Ok(true) => info!("Test run {} finished", run_id),
                        Ok(false) => debug!("Test run {} was already closed", run_id),
                        Err(e) => error!("Failed to finish test run {}: {}", run_id, e),
                    }
                }
                return;
            }
            request = &mut kill_rx, if accepting_kills => {
                // Sender dropped: a newer runner took over the session.
                let Ok(reply) = request else {
                    accepting_kills = false;
                    continue;
                };

                match child.kill().await {
                    Ok(()) => {
                        let _ = reply.send(true);
                        return;
                    }
                    Err(e) => {
                        warn!("Failed to kill runner of test run {}: {}", run_id, e);
                        let (kill_tx, next_rx) = oneshot::channel();
                        restore_session(&sessions, run_id, generation, kill_tx);
                        kill_rx = next_rx;
                        let _ = reply.send(false);
                    }
                }
            }
        }
    }
}

fn lock_sessions(sessions: &Mutex<HashMap<i32, Session>>) -> MutexGuard<'_, HashMap<i32, Session>> {
    sessions.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Forget the session of an exited runner.
///
/// Returns false when a newer runner already serves the same run, in which
/// case the exit must not close it.
fn release_session(sessions: &Mutex<HashMap<i32, Session>>, run_id: i32, generation: u64) -> bool {
    let mut guard = lock_sessions(sessions);
    match guard.get(&run_id) {
        Some(session) if session.generation != generation => false,
        Some(_) => {
            guard.remove(&run_id);
            true
        }
        None => true,
    }
}

/// Track a runner again after a kill request that did not succeed.
///
/// A newer runner registered in the meantime keeps its session.
fn restore_session(
    sessions: &Mutex<HashMap<i32, Session>>,
    run_id: i32,
    generation: u64,
    kill_tx: oneshot::Sender<KillRequest>,
) {
    lock_sessions(sessions).entry(run_id).or_insert(Session {
        generation,
        kill_tx,
    });
}
