//! Foreign-data-wrapper layer on the subscriber database.
//!
//! The subscriber imports a fixed set of publisher objects as foreign tables,
//! hides the foreign tables from the schema generator and republishes each one
//! through a local `<name>_remote_view` carrying the publisher's annotations.

use crate::annotation::{self, Annotation};
use crate::catalog::Catalog;
use crate::config::PublisherConfig;
use crate::error::MigrationError;

pub const FDW_EXTENSION: &str = "postgres_fdw";
pub const SERVER_NAME: &str = "statistics_publisher";

/// Publisher objects republished on the subscriber, in import order
pub const PUBLISHED_OBJECTS: [&str; 15] = [
    "statistic_dashboard",
    "statistic_txn_count_monthly",
    "statistic_wallet_count_monthly",
    "statistic_txn_count_daily",
    "statistic_new_wallet_count_daily",
    "statistic_active_wallet_count_daily",
    "statistic_social_leaderboard",
    "statistic_nft_leaderboard",
    "statistic_defi_leaderboard",
    "statistic_profile_transactions",
    "statistic_profile_top_nft_owners",
    "statistic_profile_earnings",
    "statistic_profile_earnings_breakdown_counts",
    "statistic_portfolio_value",
    "statistic_profile_diamond_earnings",
];

pub fn remote_view_name(name: &str) -> String {
    format!("{}_remote_view", name)
}

/// Annotations a wrapper view carries: the publisher's, minus a blanket `@omit`
fn wrapper_annotations(annotations: &[Annotation]) -> Vec<Annotation> {
    annotations
        .iter()
        .filter(|a| **a != Annotation::Omit)
        .cloned()
        .collect()
}

/// Statements installing the extension, server, user mapping, foreign tables and wrapper views
pub fn create_statements(
    config: &PublisherConfig,
    catalog: &Catalog,
) -> Result<Vec<String>, MigrationError> {
    let mut statements = vec![
        format!("CREATE EXTENSION IF NOT EXISTS {}", FDW_EXTENSION),
        format!(
            "CREATE SERVER {} FOREIGN DATA WRAPPER {} OPTIONS (host {}, port {}, dbname {})",
            SERVER_NAME,
            FDW_EXTENSION,
            annotation::quote_literal(&config.host),
            annotation::quote_literal(&config.port.to_string()),
            annotation::quote_literal(&config.dbname)
        ),
        format!(
            "CREATE USER MAPPING FOR CURRENT_USER SERVER {} OPTIONS (user {}, password {})",
            SERVER_NAME,
            annotation::quote_literal(&config.user),
            annotation::quote_literal(&config.password)
        ),
        format!(
            "IMPORT FOREIGN SCHEMA public LIMIT TO ({}) FROM SERVER {} INTO public",
            PUBLISHED_OBJECTS.join(", "),
            SERVER_NAME
        ),
    ];

    for name in PUBLISHED_OBJECTS {
        let object = catalog.get(name).ok_or_else(|| {
            MigrationError::Catalog(format!("published object {} is not in the catalog", name))
        })?;
        let remote_view = remote_view_name(name);

        statements.push(annotation::comment_statement(
            "FOREIGN TABLE",
            name,
            &[Annotation::Omit],
        ));
        statements.push(format!("CREATE VIEW {} AS SELECT * FROM {}", remote_view, name));

        let annotations = wrapper_annotations(&object.annotations);
        if !annotations.is_empty() {
            statements.push(annotation::comment_statement("VIEW", &remote_view, &annotations));
        }
    }

    Ok(statements)
}

/// Inverse of [`create_statements`], every drop guarded by `IF EXISTS`
pub fn drop_statements() -> Vec<String> {
    let mut statements: Vec<String> = PUBLISHED_OBJECTS
        .iter()
        .rev()
        .map(|name| format!("DROP VIEW IF EXISTS {}", remote_view_name(name)))
        .collect();
    statements.extend(
        PUBLISHED_OBJECTS
            .iter()
            .rev()
            .map(|name| format!("DROP FOREIGN TABLE IF EXISTS {}", name)),
    );
    statements.push(format!(
        "DROP USER MAPPING IF EXISTS FOR CURRENT_USER SERVER {}",
        SERVER_NAME
    ));
    statements.push(format!("DROP SERVER IF EXISTS {}", SERVER_NAME));
    statements.push(format!("DROP EXTENSION IF EXISTS {}", FDW_EXTENSION));
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ObjectKind;

    fn config() -> PublisherConfig {
        PublisherConfig {
            host: "publisher".to_string(),
            port: 5432,
            dbname: "deso".to_string(),
            user: "reader".to_string(),
            password: "it's".to_string(),
        }
    }

    #[test]
    fn every_published_object_is_a_view_in_the_catalog() {
        let catalog = Catalog::full();
        for name in PUBLISHED_OBJECTS {
            let object = catalog.get(name).unwrap_or_else(|| panic!("{} missing", name));
            assert!(
                matches!(object.kind, ObjectKind::MaterializedView | ObjectKind::View),
                "{}",
                name
            );
            assert!(!object.annotations.contains(&Annotation::Omit), "{} is hidden", name);
        }
    }

    #[test]
    fn server_and_mapping_use_quoted_configuration() {
        let statements = create_statements(&config(), &Catalog::full()).unwrap();
        assert_eq!(statements[0], "CREATE EXTENSION IF NOT EXISTS postgres_fdw");
        assert_eq!(
            statements[1],
            "CREATE SERVER statistics_publisher FOREIGN DATA WRAPPER postgres_fdw OPTIONS (host 'publisher', port '5432', dbname 'deso')"
        );
        assert!(statements[2].ends_with("OPTIONS (user 'reader', password 'it''s')"));
    }

    #[test]
    fn import_is_limited_to_published_objects() {
        let statements = create_statements(&config(), &Catalog::full()).unwrap();
        let import = &statements[3];
        assert!(import.starts_with("IMPORT FOREIGN SCHEMA public LIMIT TO (statistic_dashboard, "));
        assert!(import.contains("statistic_profile_earnings_breakdown_counts"));
        assert_eq!(import.matches(", ").count(), 14);
    }

    #[test]
    fn wrapper_view_carries_publisher_annotations() {
        let statements = create_statements(&config(), &Catalog::full()).unwrap();
        assert!(statements
            .contains(&"COMMENT ON FOREIGN TABLE statistic_dashboard IS '@omit'".to_string()));
        assert!(statements.contains(
            &"CREATE VIEW statistic_dashboard_remote_view AS SELECT * FROM statistic_dashboard"
                .to_string()
        ));
        assert!(statements.contains(
            &"COMMENT ON VIEW statistic_dashboard_remote_view IS '@name dashboardStat'".to_string()
        ));
    }

    #[test]
    fn wrapper_drops_blanket_omit() {
        let kept = wrapper_annotations(&[Annotation::Omit, Annotation::name("x")]);
        assert_eq!(kept, vec![Annotation::name("x")]);
    }

    #[test]
    fn rollback_removes_every_created_object() {
        let drops = drop_statements();
        for name in PUBLISHED_OBJECTS {
            assert!(drops.contains(&format!("DROP VIEW IF EXISTS {}_remote_view", name)));
            assert!(drops.contains(&format!("DROP FOREIGN TABLE IF EXISTS {}", name)));
        }
        assert_eq!(drops.last().unwrap(), "DROP EXTENSION IF EXISTS postgres_fdw");
        assert!(drops.iter().all(|d| d.contains("IF EXISTS")));
    }
}
