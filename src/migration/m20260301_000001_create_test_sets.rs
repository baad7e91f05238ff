//! Create test_sets table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TestSets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TestSets::Id)
                            .string_len(128)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TestSets::Description).string_len(256).not_null())
                    .col(ColumnDef::new(TestSets::TestPath).string_len(256).not_null())
                    .col(ColumnDef::new(TestSets::Driver).string_len(128).not_null())
                    .col(ColumnDef::new(TestSets::AdditionalArguments).json().not_null())
                    .col(ColumnDef::new(TestSets::CleanupPath).string_len(128))
                    .col(ColumnDef::new(TestSets::Meta).json())
                    .col(ColumnDef::new(TestSets::DeploymentTags).json().not_null())
                    .col(
                        ColumnDef::new(TestSets::TestRunsOrderingPriority)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(TestSets::ExclusiveTestsets).json().not_null())
                    .col(
                        ColumnDef::new(TestSets::AvailableSinceRelease)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TestSets::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TestSets {
    Table,
    Id,
    Description,
    TestPath,
    Driver,
    AdditionalArguments,
    CleanupPath,
    Meta,
    DeploymentTags,
    TestRunsOrderingPriority,
    ExclusiveTestsets,
    AvailableSinceRelease,
}
