//! Create cluster_state and cluster_testing_pattern tables.
//!
//! A testing pattern lists the tests of one test set that apply to one
//! cluster; it is recomputed whenever the cluster is registered.

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_test_sets::TestSets;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClusterState::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClusterState::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ClusterState::DeploymentTags).json().not_null())
                    .col(
                        ColumnDef::new(ClusterState::ReleaseVersion)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ClusterTestingPattern::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClusterTestingPattern::ClusterId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ClusterTestingPattern::TestSetId)
                            .string_len(128)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClusterTestingPattern::Tests).json().not_null())
                    .primary_key(
                        Index::create()
                            .col(ClusterTestingPattern::ClusterId)
                            .col(ClusterTestingPattern::TestSetId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ClusterTestingPattern::Table, ClusterTestingPattern::ClusterId)
                            .to(ClusterState::Table, ClusterState::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(ClusterTestingPattern::Table, ClusterTestingPattern::TestSetId)
                            .to(TestSets::Table, TestSets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClusterTestingPattern::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ClusterState::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ClusterState {
    Table,
    Id,
    DeploymentTags,
    ReleaseVersion,
}

#[derive(DeriveIden)]
enum ClusterTestingPattern {
    Table,
    ClusterId,
    TestSetId,
    Tests,
}
