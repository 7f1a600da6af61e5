use migration::{Migrator, SubscriberMigrator};
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::{MigrationName, MigratorTrait};
use std::error::Error;
use tracing::{error, info};

use crate::config::DatabaseConfig;

/// Connect to the database described by `config`
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, Box<dyn Error>> {
    info!("Connecting to database: {}", config.redacted_url());

    match Database::connect(&config.url).await {
        Ok(conn) => Ok(conn),
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            Err(Box::new(e))
        }
    }
}

async fn up<M: MigratorTrait>(
    connection: &DatabaseConnection,
    steps: Option<u32>,
) -> Result<(), Box<dyn Error>> {
    let all_migrations = M::migrations();
    info!("Found {} migration files", all_migrations.len());
    for m in &all_migrations {
        info!("Migration file: {}", m.name());
    }

    match steps {
        Some(n) => info!("Running {} migrations", n),
        None => info!("Running all pending migrations"),
    }

    match M::up(connection, steps).await {
        Ok(_) => {
            info!("Migrations applied");
            Ok(())
        }
        Err(e) => {
            error!("Failed to run migrations: {}", e);
            error!("Migration error details: {:?}", e);
            Err(Box::new(e))
        }
    }
}

async fn down<M: MigratorTrait>(
    connection: &DatabaseConnection,
    steps: Option<u32>,
) -> Result<(), Box<dyn Error>> {
    match steps {
        Some(n) => info!("Rolling back {} migrations", n),
        None => info!("Rolling back all applied migrations"),
    }

    match M::down(connection, steps).await {
        Ok(_) => {
            info!("Rollback complete");
            Ok(())
        }
        Err(e) => {
            error!("Failed to roll back migrations: {}", e);
            Err(Box::new(e))
        }
    }
}

async fn report<M: MigratorTrait>(connection: &DatabaseConnection) -> Result<(), Box<dyn Error>> {
    let applied = M::get_applied_migrations(connection).await?;
    let pending = M::get_pending_migrations(connection).await?;

    info!("{} applied, {} pending", applied.len(), pending.len());
    for m in &applied {
        info!("Applied: {}", m.name());
    }
    for m in &pending {
        info!("Pending: {}", m.name());
    }
    Ok(())
}

/// Execute the migrate command
pub async fn execute(steps: Option<u32>) -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::from_env()?;
    let connection = connect(&config).await?;
    up::<Migrator>(&connection, steps).await
}

/// Roll back the last `steps` statistics migrations, or all of them
pub async fn rollback(steps: Option<u32>) -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::from_env()?;
    let connection = connect(&config).await?;
    down::<Migrator>(&connection, steps).await
}

/// Roll back every statistics migration and apply them again.
/// Upstream explorer tables are never touched.
pub async fn reset() -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::from_env()?;
    let connection = connect(&config).await?;
    down::<Migrator>(&connection, None).await?;
    up::<Migrator>(&connection, None).await
}

/// Show which statistics migrations are applied
pub async fn status() -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::from_env()?;
    let connection = connect(&config).await?;
    report::<Migrator>(&connection).await
}

/// Apply the foreign-data-wrapper layer on the subscriber database
pub async fn subscriber_execute() -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::subscriber_from_env()?;
    let connection = connect(&config).await?;
    up::<SubscriberMigrator>(&connection, None).await
}

/// Remove the foreign-data-wrapper layer from the subscriber database
pub async fn subscriber_rollback() -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::subscriber_from_env()?;
    let connection = connect(&config).await?;
    down::<SubscriberMigrator>(&connection, None).await
}

pub async fn subscriber_status() -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::subscriber_from_env()?;
    let connection = connect(&config).await?;
    report::<SubscriberMigrator>(&connection).await
}
