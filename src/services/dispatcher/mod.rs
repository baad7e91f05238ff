//! Execution dispatcher: named drivers that launch and kill test runners.
//!
//! The tracker never runs tests itself. Each test set names a driver, and
//! the registry built at startup maps that name to a [`TestDriver`].

pub mod process;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::entity::{test_run, test_set};
use crate::error::{AppError, AppResult};
use crate::models::OsAccessCredentials;

pub use process::ProcessDriver;

/// Everything a driver needs to launch a runner for one test run.
#[derive(Debug)]
pub struct RunRequest {
    pub test_run: test_run::Model,
    pub test_set: test_set::Model,
    /// Connection string the runner uses to report results.
    pub dbpath: String,
    pub credentials: Option<OsAccessCredentials>,
    /// Names of the tests enabled in the run.
    pub tests: Vec<String>,
    pub token: Option<SecretString>,
}

/// Driver failures.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("failed to spawn runner '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("runner for test run {0} exited before reporting a pid")]
    MissingPid(i32),

    #[error("failed to record runner state: {0}")]
    Store(String),
}

/// A mechanism that executes the tests of a run.
#[async_trait]
pub trait TestDriver: Send + Sync {
    /// Launch the runner. Returns once the runner has been started, not
    /// when it finishes.
    async fn run(&self, request: RunRequest) -> Result<(), DriverError>;

    /// Terminate the runner of a test run. `false` means nothing was killed.
    async fn kill(&self, test_run: &test_run::Model) -> bool;
}

/// Drivers by name, resolved once at startup.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: HashMap<String, Arc<dyn TestDriver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, driver: Arc<dyn TestDriver>) {
        self.drivers.insert(name.into(), driver);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_driver(mut self, name: impl Into<String>, driver: Arc<dyn TestDriver>) -> Self {
        self.register(name, driver);
        self
    }

    pub fn get(&self, name: &str) -> AppResult<Arc<dyn TestDriver>> {
        self.drivers
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown test driver '{}'", name)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
