use sea_orm_migration::prelude::*;
use tracing::info;

use crate::catalog::Catalog;
use crate::config::PublisherConfig;
use crate::publication;
use crate::retry::RetryPolicy;
use crate::schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let config = PublisherConfig::from_env()?;
        info!(
            "Importing {} statistics from {}:{}/{}",
            publication::PUBLISHED_OBJECTS.len(),
            config.host,
            config.port,
            config.dbname
        );

        let statements = publication::create_statements(&config, &Catalog::full())?;
        schema::run_statements(
            manager.get_connection(),
            &RetryPolicy::default(),
            "statistic_fdw",
            &statements,
        )
        .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        schema::run_statements(
            manager.get_connection(),
            &RetryPolicy::default(),
            "statistic_fdw rollback",
            &publication::drop_statements(),
        )
        .await?;
        Ok(())
    }
}
