//! TestRun entity for SeaORM.

use sea_orm::entity::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "test_runs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub test_set_id: String,
    pub cluster_id: i32,
    /// Run status: running, wait_running, finished, stopped
    pub status: String,
    #[sea_orm(column_type = "Json", nullable)]
    pub meta: Option<JsonValue>,
    pub started_at: DateTimeUtc,
    pub ended_at: Option<DateTimeUtc>,
    /// Process id of the external runner, once launched.
    pub pid: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::test_set::Entity",
        from = "Column::TestSetId",
        to = "super::test_set::Column::Id",
        on_delete = "Cascade"
    )]
    TestSet,
    #[sea_orm(has_many = "super::test::Entity")]
    Tests,
}

impl Related<super::test_set::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestSet.def()
    }
}

impl Related<super::test::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
