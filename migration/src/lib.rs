pub use sea_orm_migration::prelude::*;

pub mod annotation;
pub mod catalog;
pub mod config;
pub mod error;
pub mod publication;
pub mod retry;
pub mod schema;
pub mod txn_kind;

mod m20230705_000001_create_public_key_first_transaction;
mod m20230705_000002_create_statistic_functions;
mod m20230712_000001_create_statistic_counters;
mod m20230712_000002_create_statistic_time_series;
mod m20230712_000003_create_statistic_leaderboards;
mod m20230713_000001_create_dao_coin_limit_order_views;
mod m20230713_000002_create_statistic_profile_rollups;
mod m20230713_000003_create_statistic_portfolio_value;
mod m20230714_000001_create_statistic_dashboard;
mod m20230727_000001_create_statistic_fdw;
mod m20231213_000001_create_pos_statistic_views;

pub use catalog::{Catalog, CatalogObject, RefreshCost};
pub use error::MigrationError;
pub use retry::RetryPolicy;

/// Statistics schema on the explorer database
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20230705_000001_create_public_key_first_transaction::Migration),
            Box::new(m20230705_000002_create_statistic_functions::Migration),
            Box::new(m20230712_000001_create_statistic_counters::Migration),
            Box::new(m20230712_000002_create_statistic_time_series::Migration),
            Box::new(m20230712_000003_create_statistic_leaderboards::Migration),
            Box::new(m20230713_000001_create_dao_coin_limit_order_views::Migration),
            Box::new(m20230713_000002_create_statistic_profile_rollups::Migration),
            Box::new(m20230713_000003_create_statistic_portfolio_value::Migration),
            Box::new(m20230714_000001_create_statistic_dashboard::Migration),
            Box::new(m20231213_000001_create_pos_statistic_views::Migration),
        ]
    }
}

/// Foreign-data-wrapper layer on a subscriber database, tracked apart from [`Migrator`]
pub struct SubscriberMigrator;

#[async_trait::async_trait]
impl MigratorTrait for SubscriberMigrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20230727_000001_create_statistic_fdw::Migration)]
    }

    fn migration_table_name() -> DynIden {
        Alias::new("statistic_fdw_migrations").into_iden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_in_version_order() {
        let names: Vec<String> = Migrator::migrations().iter().map(|m| m.name().to_string()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 10);
        assert!(!names.contains(&"m20230727_000001_create_statistic_fdw".to_string()));
    }

    #[test]
    fn subscriber_uses_its_own_bookkeeping_table() {
        assert_eq!(
            SubscriberMigrator::migration_table_name().to_string(),
            "statistic_fdw_migrations"
        );
        assert_eq!(SubscriberMigrator::migrations().len(), 1);
    }

    #[test]
    fn rollback_sets_cover_every_created_object() {
        let catalog = Catalog::full();
        for object in catalog.objects() {
            let drop = object.drop_statement();
            assert!(drop.contains("IF EXISTS"), "{}", drop);
            assert!(drop.contains(object.name), "{}", drop);
        }
    }
}
