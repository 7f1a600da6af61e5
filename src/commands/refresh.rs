use migration::catalog::Catalog;
use migration::retry::RetryPolicy;
use migration::schema::run_statements;
use migration::RefreshCost;
use std::error::Error;
use tracing::{info, warn};

use super::migrate::connect;
use crate::config::DatabaseConfig;

pub const TOP_UP_STATEMENT: &str = "SELECT refresh_public_key_first_transaction()";

/// `REFRESH` statement for every view in the plan, leaves first
pub fn refresh_statements(catalog: &Catalog, max_cost: RefreshCost) -> Vec<(&'static str, String)> {
    catalog
        .refresh_plan(max_cost)
        .into_iter()
        .map(|view| {
            (
                view.name,
                format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {}", view.name),
            )
        })
        .collect()
}

/// Top up the first-transaction table, then refresh materialized views up to `max_cost`
pub async fn execute(max_cost: RefreshCost, skip_top_up: bool) -> Result<(), Box<dyn Error>> {
    let config = DatabaseConfig::from_env()?;
    let connection = connect(&config).await?;
    let policy = RetryPolicy::default();
    let catalog = Catalog::full();
    catalog.validate()?;

    if skip_top_up {
        warn!("Skipping public_key_first_transaction top-up, wallet counters may lag");
    } else {
        info!("Topping up public_key_first_transaction");
        run_statements(
            &connection,
            &policy,
            "public_key_first_transaction top-up",
            &[TOP_UP_STATEMENT.to_string()],
        )
        .await?;
    }

    let statements = refresh_statements(&catalog, max_cost);
    info!(
        "Refreshing {} materialized views up to {} cost",
        statements.len(),
        max_cost
    );
    for (name, statement) in &statements {
        info!("Refreshing {}", name);
        run_statements(&connection, &policy, name, std::slice::from_ref(statement)).await?;
    }

    info!("Refresh complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refreshes_concurrently_in_plan_order() {
        let catalog = Catalog::full();
        let statements = refresh_statements(&catalog, RefreshCost::Heavy);
        assert_eq!(statements.len(), catalog.materialized_views().count());
        assert!(statements
            .iter()
            .all(|(name, sql)| sql == &format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {}", name)));
    }

    #[test]
    fn light_refresh_skips_heavy_views() {
        let catalog = Catalog::full();
        let names: Vec<&str> = refresh_statements(&catalog, RefreshCost::Light)
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert!(names.contains(&"statistic_txn_count_all"));
        assert!(!names.contains(&"statistic_profile_transactions"));
        assert!(!names.contains(&"statistic_profile_earnings"));
    }
}
