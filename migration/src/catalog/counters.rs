//! Scalar counters: one row, `id = 0`, one value column

use super::{CatalogObject, RefreshCost, Shape};
use crate::annotation::Annotation;
use crate::txn_kind::{TxnCategory, TxnKind, PARTITION_COUNT};

fn counter(name: &'static str, cost: RefreshCost) -> CatalogObject {
    CatalogObject::materialized(name, Shape::Singleton, cost).annotate(Annotation::Omit)
}

/// Row-count estimate of a relation from catalog statistics
fn estimate(relation: &str) -> String {
    format!(
        "COALESCE((SELECT reltuples::BIGINT FROM pg_class WHERE relname = '{}'), 0)",
        relation
    )
}

fn category_counter(name: &'static str, category: TxnCategory) -> CatalogObject {
    counter(name, RefreshCost::Light)
        .depends_on(&["get_transaction_count"])
        .body(format!(
            "SELECT 0 AS id, {} AS count",
            category.count_expression()
        ))
}

pub fn objects() -> Vec<CatalogObject> {
    let posts = TxnKind::SubmitPost.partition_table();

    vec![
        counter("statistic_txn_count_all", RefreshCost::Light)
            .depends_on(&["get_transaction_count"])
            .body(format!(
                "SELECT 0 AS id, SUM(get_transaction_count(partition_id))::BIGINT AS count\nFROM generate_series(1, {}) AS partition_id",
                PARTITION_COUNT
            )),
        counter("statistic_txn_count_30_d", RefreshCost::Heavy)
            .reads(&["transaction", "block"])
            .body(
                r#"
SELECT 0 AS id, COUNT(*) AS count
FROM transaction t
JOIN block b ON b.block_hash = t.block_hash
WHERE b.timestamp > NOW() - INTERVAL '30 days'"#,
            ),
        counter("statistic_block_height_current", RefreshCost::Light)
            .reads(&["block"])
            .body(
                r#"
SELECT 0 AS id, COALESCE((SELECT height FROM block ORDER BY height DESC LIMIT 1), 0) AS height"#,
            ),
        counter("statistic_txn_count_pending", RefreshCost::Medium)
            .reads(&["transaction"])
            .body("SELECT 0 AS id, COUNT(*) AS count FROM transaction WHERE block_hash = ''"),
        counter("statistic_txn_fee_1_d", RefreshCost::Medium)
            .reads_partition(TxnKind::SubmitPost)
            .body(format!(
                r#"
SELECT 0 AS id, COALESCE(AVG(fee_nanos), 0)::BIGINT AS fee_nanos
FROM {}
WHERE fee_nanos > 0 AND timestamp > NOW() - INTERVAL '1 day'"#,
                posts
            )),
        counter("statistic_total_supply", RefreshCost::Medium)
            .reads(&["deso_balance_entry"])
            .body("SELECT 0 AS id, COALESCE(SUM(balance_nanos), 0) AS total_supply FROM deso_balance_entry"),
        counter("statistic_post_count", RefreshCost::Medium)
            .reads(&["post_entry"])
            .body(
                r#"
SELECT 0 AS id, COUNT(*) AS count
FROM post_entry
WHERE parent_post_hash IS NULL
    AND reposted_post_hash IS NULL
    AND NOT COALESCE(extra_data ? 'BlogDeltaRtfFormat', false)"#,
            ),
        counter("statistic_post_longform_count", RefreshCost::Medium)
            .reads(&["post_entry"])
            .body(
                r#"
SELECT 0 AS id, COUNT(*) AS count
FROM post_entry
WHERE parent_post_hash IS NULL
    AND reposted_post_hash IS NULL
    AND COALESCE(extra_data ? 'BlogDeltaRtfFormat', false)"#,
            ),
        counter("statistic_comment_count", RefreshCost::Medium)
            .reads(&["post_entry"])
            .body("SELECT 0 AS id, COUNT(*) AS count FROM post_entry WHERE parent_post_hash IS NOT NULL"),
        counter("statistic_repost_count", RefreshCost::Medium)
            .reads(&["post_entry"])
            .body(
                r#"
SELECT 0 AS id, COUNT(*) AS count
FROM post_entry
WHERE reposted_post_hash IS NOT NULL AND parent_post_hash IS NULL"#,
            ),
        category_counter("statistic_txn_count_creator_coin", TxnCategory::CreatorCoin),
        category_counter("statistic_txn_count_nft", TxnCategory::Nft),
        category_counter("statistic_txn_count_dex", TxnCategory::Dex),
        category_counter("statistic_txn_count_social", TxnCategory::Social),
        counter("statistic_follow_count", RefreshCost::Light)
            .reads(&["pg_class", "follow_entry"])
            .body(format!("SELECT 0 AS id, {} AS count", estimate("follow_entry"))),
        // Two estimates summed into one row; the subquery has one row per table.
        counter("statistic_message_count", RefreshCost::Light)
            .reads(&["pg_class", "message_entry", "new_message_entry"])
            .body(
                r#"
SELECT 0 AS id, COALESCE(SUM(reltuples), 0)::BIGINT AS count
FROM (
    SELECT reltuples FROM pg_class WHERE relname = 'message_entry'
    UNION ALL
    SELECT reltuples FROM pg_class WHERE relname = 'new_message_entry'
) estimates"#,
            ),
        counter("statistic_wallet_count_all", RefreshCost::Light)
            .depends_on(&["public_key_first_transaction"])
            .reads(&["pg_class"])
            .body(format!(
                "SELECT 0 AS id, {} AS count",
                estimate("public_key_first_transaction")
            )),
        counter("statistic_new_wallet_count_30_d", RefreshCost::Medium)
            .depends_on(&["public_key_first_transaction"])
            .body(
                r#"
SELECT 0 AS id, COUNT(*) AS count
FROM public_key_first_transaction
WHERE timestamp > NOW() - INTERVAL '30 days'"#,
            ),
        counter("statistic_active_wallet_count_30_d", RefreshCost::Heavy)
            .reads(&["transaction", "block"])
            .body(
                r#"
SELECT 0 AS id, COUNT(DISTINCT t.public_key) AS count
FROM transaction t
JOIN block b ON b.block_hash = t.block_hash
WHERE b.timestamp > NOW() - INTERVAL '30 days'"#,
            ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_the_nineteen_dashboard_singletons() {
        let counters = objects();
        assert_eq!(counters.len(), 19);
        assert!(counters.iter().all(|c| c.shape == Shape::Singleton));
    }

    #[test]
    fn message_count_sums_both_estimates_into_one_row() {
        let counters = objects();
        let messages = counters
            .iter()
            .find(|c| c.name == "statistic_message_count")
            .unwrap();
        assert!(messages.body.contains("SUM(reltuples)"));
        assert!(messages.body.contains("'message_entry'"));
        assert!(messages.body.contains("'new_message_entry'"));
    }

    #[test]
    fn fee_average_reads_post_partition() {
        let counters = objects();
        let fee = counters
            .iter()
            .find(|c| c.name == "statistic_txn_fee_1_d")
            .unwrap();
        assert_eq!(fee.base_tables, vec!["transaction_partition_05"]);
    }
}
