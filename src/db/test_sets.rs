//! Database queries for test sets and their template tests.

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::Value as JsonValue;

use crate::entity::StringList;
use crate::entity::test::{self, ActiveModel as TestActiveModel, Entity as Test};
use crate::entity::test_set::{self, ActiveModel as TestSetActiveModel, Entity as TestSet};
use crate::error::{AppError, AppResult};

use super::DbPool;

/// Represents a template test to be inserted for a test set.
#[derive(Debug, Clone)]
pub struct NewTemplateTest {
    pub name: String,
    pub title: String,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub meta: Option<JsonValue>,
    pub deployment_tags: Vec<String>,
    pub available_since_release: String,
}

impl DbPool {
    /// Get a test set by ID.
    pub async fn get_test_set(&self, id: &str) -> AppResult<Option<test_set::Model>> {
        let result = TestSet::find_by_id(id.to_string())
            .one(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to get test set: {}", e)))?;

        Ok(result)
    }

    /// List every test set ordered by run priority.
    pub async fn list_test_sets(&self) -> AppResult<Vec<test_set::Model>> {
        let result = TestSet::find()
            .order_by_asc(test_set::Column::TestRunsOrderingPriority)
            .order_by_asc(test_set::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list test sets: {}", e)))?;

        Ok(result)
    }

    /// Get all template tests, ordered by test set and name.
    pub async fn list_template_tests(&self) -> AppResult<Vec<test::Model>> {
        let result = Test::find()
            .filter(test::Column::TestRunId.is_null())
            .order_by_asc(test::Column::TestSetId)
            .order_by_asc(test::Column::Name)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list template tests: {}", e)))?;

        Ok(result)
    }
}

/// Template tests of a test set, optionally restricted to a list of names.
pub async fn template_tests<C: ConnectionTrait>(
    conn: &C,
    test_set_id: &str,
    only: Option<&StringList>,
) -> AppResult<Vec<test::Model>> {
    let mut select = Test::find()
        .filter(test::Column::TestSetId.eq(test_set_id))
        .filter(test::Column::TestRunId.is_null());

    if let Some(names) = only {
        select = select.filter(test::Column::Name.is_in(names.iter().cloned()));
    }

    let result = select
        .order_by_asc(test::Column::Name)
        .all(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get template tests: {}", e)))?;

    Ok(result)
}

/// Insert a test set or overwrite its catalog fields.
pub async fn save_test_set<C: ConnectionTrait>(conn: &C, model: test_set::Model) -> AppResult<()> {
    let active = TestSetActiveModel {
        id: Set(model.id),
        description: Set(model.description),
        test_path: Set(model.test_path),
        driver: Set(model.driver),
        additional_arguments: Set(model.additional_arguments),
        cleanup_path: Set(model.cleanup_path),
        meta: Set(model.meta),
        deployment_tags: Set(model.deployment_tags),
        test_runs_ordering_priority: Set(model.test_runs_ordering_priority),
        exclusive_testsets: Set(model.exclusive_testsets),
        available_since_release: Set(model.available_since_release),
    };

    TestSet::insert(active)
        .on_conflict(
            OnConflict::column(test_set::Column::Id)
                .update_columns([
                    test_set::Column::Description,
                    test_set::Column::TestPath,
                    test_set::Column::Driver,
                    test_set::Column::AdditionalArguments,
                    test_set::Column::CleanupPath,
                    test_set::Column::Meta,
                    test_set::Column::DeploymentTags,
                    test_set::Column::TestRunsOrderingPriority,
                    test_set::Column::ExclusiveTestsets,
                    test_set::Column::AvailableSinceRelease,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to save test set: {}", e)))?;

    Ok(())
}

/// Replace the template tests of a test set. Per-run copies are untouched.
pub async fn replace_template_tests<C: ConnectionTrait>(
    conn: &C,
    test_set_id: &str,
    templates: Vec<NewTemplateTest>,
) -> AppResult<()> {
    Test::delete_many()
        .filter(test::Column::TestSetId.eq(test_set_id))
        .filter(test::Column::TestRunId.is_null())
        .exec(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to delete template tests: {}", e)))?;

    if templates.is_empty() {
        return Ok(());
    }

    let models = templates.into_iter().map(|t| TestActiveModel {
        id: NotSet,
        name: Set(t.name),
        title: Set(t.title),
        description: Set(t.description),
        duration: Set(t.duration),
        message: Set(None),
        traceback: Set(None),
        status: Set(None),
        step: Set(None),
        time_taken: Set(None),
        meta: Set(t.meta),
        deployment_tags: Set(StringList(t.deployment_tags)),
        available_since_release: Set(t.available_since_release),
        test_run_id: Set(None),
        test_set_id: Set(test_set_id.to_string()),
    });

    Test::insert_many(models)
        .exec_without_returning(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to insert template tests: {}", e)))?;

    Ok(())
}
