//! Create test_runs table.

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
                    .table(TestRuns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TestRuns::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TestRuns::TestSetId).string_len(128).not_null())
                    .col(ColumnDef::new(TestRuns::ClusterId).integer().not_null())
                    .col(ColumnDef::new(TestRuns::Status).string_len(20).not_null())
                    .col(ColumnDef::new(TestRuns::Meta).json())
                    .col(
                        ColumnDef::new(TestRuns::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(TestRuns::EndedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(TestRuns::Pid).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .from(TestRuns::Table, TestRuns::TestSetId)
                            .to(TestSets::Table, TestSets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_test_runs_test_set_cluster")
                    .table(TestRuns::Table)
                    .col(TestRuns::TestSetId)
                    .col(TestRuns::ClusterId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestRuns::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TestRuns {
    Table,
    Id,
    TestSetId,
    ClusterId,
    Status,
    Meta,
    StartedAt,
    EndedAt,
    Pid,
}
