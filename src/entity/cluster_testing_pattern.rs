//! ClusterTestingPattern entity for SeaORM.

use sea_orm::entity::prelude::*;

use super::StringList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cluster_testing_pattern")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub cluster_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub test_set_id: String,
    /// Names of the tests of the test set that apply to the cluster.
    #[sea_orm(column_type = "Json")]
    pub tests: StringList,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cluster_state::Entity",
        from = "Column::ClusterId",
        to = "super::cluster_state::Column::Id",
        on_delete = "Cascade"
    )]
    ClusterState,
    #[sea_orm(
        belongs_to = "super::test_set::Entity",
        from = "Column::TestSetId",
        to = "super::test_set::Column::Id",
        on_delete = "Cascade"
    )]
    TestSet,
}

impl Related<super::cluster_state::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ClusterState.def()
    }
}

impl Related<super::test_set::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestSet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
