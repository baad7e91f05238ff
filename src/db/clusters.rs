//! Database queries for cluster state and testing patterns.

use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::entity::StringList;
use crate::entity::cluster_state::{self, ActiveModel as ClusterActiveModel, Entity as ClusterState};
use crate::entity::cluster_testing_pattern::{
    self, ActiveModel as PatternActiveModel, Entity as ClusterTestingPattern,
};
use crate::entity::{test, test_set};
use crate::error::{AppError, AppResult};

use super::DbPool;

/// Tests of one test set found applicable to a cluster.
#[derive(Debug, Clone)]
pub struct NewTestingPattern {
    pub test_set_id: String,
    pub tests: Vec<String>,
}

impl DbPool {
    /// Get the recorded state of a cluster.
    pub async fn get_cluster(&self, cluster_id: i32) -> AppResult<Option<cluster_state::Model>> {
        get_cluster_state(self.connection(), cluster_id).await
    }

    /// Testing patterns of a cluster, ordered by test set.
    pub async fn list_testing_patterns(
        &self,
        cluster_id: i32,
    ) -> AppResult<Vec<cluster_testing_pattern::Model>> {
        let result = ClusterTestingPattern::find()
            .filter(cluster_testing_pattern::Column::ClusterId.eq(cluster_id))
            .order_by_asc(cluster_testing_pattern::Column::TestSetId)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list testing patterns: {}", e)))?;

        Ok(result)
    }

    /// Record a cluster and replace its testing patterns in one transaction.
    pub async fn save_cluster(
        &self,
        cluster_id: i32,
        deployment_tags: Vec<String>,
        release_version: String,
        patterns: Vec<NewTestingPattern>,
    ) -> AppResult<()> {
        let txn = self.connection().begin().await?;

        let state = ClusterActiveModel {
            id: Set(cluster_id),
            deployment_tags: Set(StringList(deployment_tags)),
            release_version: Set(release_version),
        };

        ClusterState::insert(state)
            .on_conflict(
                OnConflict::column(cluster_state::Column::Id)
                    .update_columns([
                        cluster_state::Column::DeploymentTags,
                        cluster_state::Column::ReleaseVersion,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to save cluster: {}", e)))?;

        ClusterTestingPattern::delete_many()
            .filter(cluster_testing_pattern::Column::ClusterId.eq(cluster_id))
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(format!("Failed to clear testing patterns: {}", e)))?;

        if !patterns.is_empty() {
            let models = patterns.into_iter().map(|p| PatternActiveModel {
                cluster_id: Set(cluster_id),
                test_set_id: Set(p.test_set_id),
                tests: Set(StringList(p.tests)),
            });

            ClusterTestingPattern::insert_many(models)
                .exec_without_returning(&txn)
                .await
                .map_err(|e| {
                    AppError::Database(format!("Failed to insert testing patterns: {}", e))
                })?;
        }

        txn.commit().await?;

        Ok(())
    }

    /// Test sets with a testing pattern for the cluster, by run priority.
    pub async fn test_sets_for_cluster(&self, cluster_id: i32) -> AppResult<Vec<test_set::Model>> {
        let patterns = self.list_testing_patterns(cluster_id).await?;
        if patterns.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = patterns.into_iter().map(|p| p.test_set_id).collect();
        let result = test_set::Entity::find()
            .filter(test_set::Column::Id.is_in(ids))
            .order_by_asc(test_set::Column::TestRunsOrderingPriority)
            .order_by_asc(test_set::Column::Id)
            .all(self.connection())
            .await
            .map_err(|e| AppError::Database(format!("Failed to list cluster test sets: {}", e)))?;

        Ok(result)
    }

    /// Template tests named by the cluster's testing patterns.
    pub async fn template_tests_for_cluster(&self, cluster_id: i32) -> AppResult<Vec<test::Model>> {
        let patterns = self.list_testing_patterns(cluster_id).await?;

        let mut result = Vec::new();
        for pattern in patterns {
            let tests = super::test_sets::template_tests(
                self.connection(),
                &pattern.test_set_id,
                Some(&pattern.tests),
            )
            .await?;
            result.extend(tests);
        }

        Ok(result)
    }
}

/// Testing pattern of one test set on a cluster.
pub async fn get_testing_pattern<C: ConnectionTrait>(
    conn: &C,
    cluster_id: i32,
    test_set_id: &str,
) -> AppResult<Option<cluster_testing_pattern::Model>> {
    let result = ClusterTestingPattern::find_by_id((cluster_id, test_set_id.to_string()))
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get testing pattern: {}", e)))?;

    Ok(result)
}

/// Recorded state of a cluster; `None` for clusters never registered.
pub async fn get_cluster_state<C: ConnectionTrait>(
    conn: &C,
    cluster_id: i32,
) -> AppResult<Option<cluster_state::Model>> {
    let result = ClusterState::find_by_id(cluster_id)
        .one(conn)
        .await
        .map_err(|e| AppError::Database(format!("Failed to get cluster: {}", e)))?;

    Ok(result)
}
