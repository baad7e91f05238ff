//! ClusterState entity for SeaORM.

use sea_orm::entity::prelude::*;

use super::StringList;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cluster_state")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    #[sea_orm(column_type = "Json")]
    pub deployment_tags: StringList,
    pub release_version: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cluster_testing_pattern::Entity")]
    TestingPatterns,
}

impl Related<super::cluster_testing_pattern::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TestingPatterns.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
