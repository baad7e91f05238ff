//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_test_sets;
mod m20260301_000002_create_cluster_state;
mod m20260301_000003_create_test_runs;
mod m20260301_000005_create_active_run_index;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_test_sets::Migration),
            Box::new(m20260301_000002_create_cluster_state::Migration),
            Box::new(m20260301_000003_create_test_runs::Migration),
            Box::new(m20260301_000004_create_tests::Migration),
            Box::new(m20260301_000005_create_active_run_index::Migration),
        ]
    }
}
