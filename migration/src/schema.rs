//! Applies rendered catalog DDL through the retry wrapper

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::{ConnectionTrait, TransactionTrait};
use std::time::Duration;
use tracing::info;

use crate::catalog::{Catalog, CatalogObject};
use crate::error::MigrationError;
use crate::retry::{execute_with_retry, RetryPolicy};

/// Server-side timeout for one attempt, never zero since zero disables it
fn statement_timeout(remaining: Duration) -> String {
    format!(
        "SET LOCAL statement_timeout = {}",
        remaining.as_millis().max(1)
    )
}

/// Runs `statements` as one retried block.
///
/// Every attempt opens its own transaction (a savepoint when the caller is already
/// inside one) so a failed attempt leaves nothing behind and the server cancels
/// statements that outlive the deadline.
pub async fn run_statements<C>(
    db: &C,
    policy: &RetryPolicy,
    label: &str,
    statements: &[String],
) -> Result<(), MigrationError>
where
    C: ConnectionTrait + TransactionTrait,
{
    if statements.is_empty() {
        return Ok(());
    }
    let query = statements.join(";\n");

    execute_with_retry(policy, label, &query, |remaining| async move {
        let txn = db.begin().await?;
        txn.execute_unprepared(&statement_timeout(remaining)).await?;
        for statement in statements {
            txn.execute_unprepared(statement).await?;
        }
        txn.commit().await
    })
    .await
}

/// Creates `objects` in order, one retried block per object
pub async fn create_objects(
    manager: &SchemaManager<'_>,
    objects: &[CatalogObject],
) -> Result<(), DbErr> {
    Catalog::full().validate()?;

    let policy = RetryPolicy::default();
    for object in objects {
        info!("Creating {}", object.name);
        run_statements(
            manager.get_connection(),
            &policy,
            object.name,
            &object.create_statements(),
        )
        .await?;
    }
    Ok(())
}

/// Drops `objects` in reverse creation order
pub async fn drop_objects(
    manager: &SchemaManager<'_>,
    objects: &[CatalogObject],
) -> Result<(), DbErr> {
    let statements: Vec<String> = objects.iter().rev().map(|o| o.drop_statement()).collect();
    info!("Dropping {} objects", statements.len());
    run_statements(
        manager.get_connection(),
        &RetryPolicy::default(),
        "rollback",
        &statements,
    )
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_never_zero() {
        assert_eq!(statement_timeout(Duration::ZERO), "SET LOCAL statement_timeout = 1");
        assert_eq!(
            statement_timeout(Duration::from_secs(90 * 60)),
            "SET LOCAL statement_timeout = 5400000"
        );
    }
}
