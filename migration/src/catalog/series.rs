//! Time-bucketed series for the dashboard charts

use super::{CatalogObject, RefreshCost, Shape};
use crate::annotation::Annotation;

#[derive(Debug, Clone, Copy)]
enum Bucket {
    Day,
    Month,
}

impl Bucket {
    fn column(self) -> &'static str {
        match self {
            Bucket::Day => "day",
            Bucket::Month => "month",
        }
    }

    /// How far back a series of this bucket size reaches
    fn window(self) -> &'static str {
        match self {
            Bucket::Day => "1 month",
            Bucket::Month => "1 year",
        }
    }
}

/// Wraps a grouped query so each bucket also gets a sequential `id`
fn numbered(bucket: Bucket, value: &str, grouped: &str) -> String {
    let column = bucket.column();
    format!(
        "SELECT ROW_NUMBER() OVER (ORDER BY {column}) AS id, {column}, {value}\nFROM (\n{grouped}\n) buckets",
        column = column,
        value = value,
        grouped = grouped.trim()
    )
}

fn transaction_count(name: &'static str, bucket: Bucket, public_name: &str) -> CatalogObject {
    let column = bucket.column();
    let grouped = format!(
        r#"
    SELECT date_trunc('{column}', b.timestamp) AS {column}, COUNT(*) AS transaction_count
    FROM transaction t
    JOIN block b ON b.block_hash = t.block_hash
    WHERE b.timestamp > date_trunc('{column}', NOW() - INTERVAL '{window}')
    GROUP BY 1"#,
        column = column,
        window = bucket.window()
    );
    CatalogObject::materialized(name, Shape::Series, RefreshCost::Heavy)
        .key(&[column])
        .reads(&["transaction", "block"])
        .body(numbered(bucket, "transaction_count", &grouped))
        .annotate(Annotation::name(public_name))
        .annotate(Annotation::unique(&[column]))
}

fn new_wallet_count(name: &'static str, bucket: Bucket, public_name: &str) -> CatalogObject {
    let column = bucket.column();
    let grouped = format!(
        r#"
    SELECT date_trunc('{column}', timestamp) AS {column}, COUNT(*) AS wallet_count
    FROM public_key_first_transaction
    WHERE timestamp > date_trunc('{column}', NOW() - INTERVAL '{window}')
    GROUP BY 1"#,
        column = column,
        window = bucket.window()
    );
    CatalogObject::materialized(name, Shape::Series, RefreshCost::Medium)
        .key(&[column])
        .depends_on(&["public_key_first_transaction"])
        .body(numbered(bucket, "wallet_count", &grouped))
        .annotate(Annotation::name(public_name))
        .annotate(Annotation::unique(&[column]))
}

pub fn objects() -> Vec<CatalogObject> {
    let active_wallets = r#"
    SELECT date_trunc('day', tp.timestamp) AS day, COUNT(DISTINCT tp.public_key) AS wallet_count
    FROM transaction_partitioned tp
    WHERE tp.timestamp > date_trunc('day', NOW() - INTERVAL '1 month')
    GROUP BY 1"#;

    vec![
        transaction_count("statistic_txn_count_monthly", Bucket::Month, "monthlyTxnCountStat"),
        new_wallet_count(
            "statistic_wallet_count_monthly",
            Bucket::Month,
            "monthlyNewWalletCountStat",
        ),
        transaction_count("statistic_txn_count_daily", Bucket::Day, "dailyTxnCountStat"),
        new_wallet_count(
            "statistic_new_wallet_count_daily",
            Bucket::Day,
            "dailyNewWalletCountStat",
        ),
        CatalogObject::materialized(
            "statistic_active_wallet_count_daily",
            Shape::Series,
            RefreshCost::Heavy,
        )
        .key(&["day"])
        .reads(&["transaction_partitioned"])
        .body(numbered(Bucket::Day, "wallet_count", active_wallets))
        .annotate(Annotation::name("dailyActiveWalletCountStat"))
        .annotate(Annotation::unique(&["day"])),
    ]
}
