//! TestSet entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

use super::StringList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_sets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub description: String,
    pub test_path: String,
    /// Name of the driver in the dispatcher registry.
    pub driver: String,
    #[sea_orm(column_type = "Json")]
    pub additional_arguments: StringList,
    pub cleanup_path: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub meta: Option<JsonValue>,
    #[sea_orm(column_type = "Json")]
    pub deployment_tags: StringList,
    pub test_runs_ordering_priority: i32,
    /// Test sets that cannot run on the same cluster at the same time.
    #[sea_orm(column_type = "Json")]
    pub exclusive_testsets: StringList,
    pub available_since_release: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::test::Entity")]
    Tests,
    #[sea_orm(has_many = "super::test_run::Entity")]
    TestRuns,
    #[sea_orm(has_many = "super::cluster_testing_pattern::Entity")]
    ClusterTestingPatterns,
}

impl Related<super::test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tests.def()
    }
}

impl Related<super::test_run::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestRuns.def()
    }
}

impl Related<super::cluster_testing_pattern::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClusterTestingPatterns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
