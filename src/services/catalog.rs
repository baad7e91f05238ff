//! Test catalog loading and synchronization.
//!
//! The catalog is a JSON document listing test sets and their tests. Syncing
//! upserts the test sets and replaces their template tests; tests already
//! copied into runs are never touched.

use std::collections::HashSet;
use std::path::Path;

use sea_orm::TransactionTrait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::info;

use crate::db::DbPool;
use crate::db::test_sets::{self, NewTemplateTest};
use crate::entity::{StringList, test_set};
use crate::error::{AppError, AppResult};

const DEFAULT_DRIVER: &str = "nose";

/// Root of the catalog file.
#[derive(Debug, Deserialize)]
pub struct Catalog {
    pub test_sets: Vec<CatalogTestSet>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogTestSet {
    pub id: String,
    pub description: String,
    pub test_path: String,
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub additional_arguments: Vec<String>,
    #[serde(default)]
    pub cleanup_path: Option<String>,
    #[serde(default)]
    pub meta: Option<JsonValue>,
    #[serde(default)]
    pub deployment_tags: Vec<String>,
    #[serde(default)]
    pub test_runs_ordering_priority: i32,
    #[serde(default)]
    pub exclusive_testsets: Vec<String>,
    #[serde(default)]
    pub available_since_release: String,
    #[serde(default)]
    pub tests: Vec<CatalogTest>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogTest {
    /// Dotted path the runner uses to select the test.
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub meta: Option<JsonValue>,
    #[serde(default)]
    pub deployment_tags: Vec<String>,
    #[serde(default)]
    pub available_since_release: String,
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

/// Counts written by a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub test_sets: usize,
    pub tests: usize,
}

/// Read and validate a catalog file.
pub async fn load_catalog(path: &Path) -> AppResult<Catalog> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::InvalidInput(format!("Failed to read catalog {}: {}", path.display(), e))
    })?;

    parse_catalog(&content)
}

/// Parse and validate catalog JSON.
pub fn parse_catalog(content: &str) -> AppResult<Catalog> {
    let catalog: Catalog = serde_json::from_str(content)?;
    validate(&catalog)?;

    Ok(catalog)
}

fn validate(catalog: &Catalog) -> AppResult<()> {
    let mut ids = HashSet::new();

    for test_set in &catalog.test_sets {
        if test_set.id.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Catalog test set id must not be empty".to_string(),
            ));
        }
        if !ids.insert(test_set.id.as_str()) {
            return Err(AppError::InvalidInput(format!(
                "Duplicate test set '{}' in catalog",
                test_set.id
            )));
        }
        if test_set.test_path.trim().is_empty() {
            return Err(AppError::InvalidInput(format!(
                "Test set '{}' has no test_path",
                test_set.id
            )));
        }

        let mut names = HashSet::new();
        for test in &test_set.tests {
            if test.name.trim().is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "Test set '{}' has a test without a name",
                    test_set.id
                )));
            }
            if !names.insert(test.name.as_str()) {
                return Err(AppError::InvalidInput(format!(
                    "Duplicate test '{}' in test set '{}'",
                    test.name, test_set.id
                )));
            }
        }
    }

    for test_set in &catalog.test_sets {
        if let Some(unknown) = test_set
            .exclusive_testsets
            .iter()
            .find(|id| !ids.contains(id.as_str()))
        {
            return Err(AppError::InvalidInput(format!(
                "Test set '{}' lists unknown exclusive test set '{}'",
                test_set.id, unknown
            )));
        }
    }

    Ok(())
}

/// Write the catalog into the database in one transaction.
pub async fn sync_catalog(pool: &DbPool, catalog: Catalog) -> AppResult<SyncSummary> {
    let txn = pool.connection().begin().await?;
    let mut summary = SyncSummary {
        test_sets: 0,
        tests: 0,
    };

    for entry in catalog.test_sets {
        let templates: Vec<NewTemplateTest> = entry
            .tests
            .into_iter()
            .map(|t| NewTemplateTest {
                name: t.name,
                title: t.title,
                description: t.description,
                duration: t.duration,
                meta: t.meta,
                deployment_tags: t.deployment_tags,
                available_since_release: t.available_since_release,
            })
            .collect();

        let model = test_set::Model {
            id: entry.id,
            description: entry.description,
            test_path: entry.test_path,
            driver: entry.driver,
            additional_arguments: StringList(entry.additional_arguments),
            cleanup_path: entry.cleanup_path,
            meta: entry.meta,
            deployment_tags: StringList(entry.deployment_tags),
            test_runs_ordering_priority: entry.test_runs_ordering_priority,
            exclusive_testsets: StringList(entry.exclusive_testsets),
            available_since_release: entry.available_since_release,
        };
        let id = model.id.clone();

        test_sets::save_test_set(&txn, model).await?;
        summary.tests += templates.len();
        test_sets::replace_template_tests(&txn, &id, templates).await?;
        summary.test_sets += 1;
    }

    txn.commit().await?;

    info!(
        "Catalog synced: {} test sets, {} tests",
        summary.test_sets, summary.tests
    );

    Ok(summary)
}
