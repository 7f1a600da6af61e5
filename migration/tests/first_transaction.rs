mod common;

use migration::catalog::helpers;

async fn first_seen(txn: &migration::sea_orm::DatabaseTransaction, key: &str) -> Option<String> {
    common::scalar(
        txn,
        &format!(
            "SELECT timestamp::DATE || ' ' || height FROM public_key_first_transaction WHERE public_key = '{}'",
            key
        ),
    )
    .await
}

#[tokio::test]
async fn bootstrap_then_top_up() {
    let Some(txn) = common::isolated().await else {
        return;
    };
    common::create_chain_tables(&txn).await;
    common::exec(
        &txn,
        r#"
INSERT INTO block VALUES ('b1', 100, '2023-01-01 00:00:00');
INSERT INTO transaction (transaction_hash, block_hash, public_key, timestamp) VALUES ('t1', 'b1', 'A', '2023-01-01 00:00:00');
INSERT INTO affected_public_key VALUES ('t1', 'A', 'BasicTransferOutput'), ('t1', 'B', 'BasicTransferOutput');
"#,
    )
    .await;

    common::install(&txn, &helpers::first_transaction_objects()).await;

    assert_eq!(
        common::scalar(&txn, "SELECT COUNT(*) FROM public_key_first_transaction")
            .await
            .as_deref(),
        Some("2")
    );
    assert_eq!(first_seen(&txn, "A").await.as_deref(), Some("2023-01-01 100"));
    assert_eq!(first_seen(&txn, "B").await.as_deref(), Some("2023-01-01 100"));

    common::exec(
        &txn,
        r#"
INSERT INTO block VALUES ('b2', 200, '2023-02-01 00:00:00');
INSERT INTO transaction (transaction_hash, block_hash, public_key, timestamp) VALUES ('t2', 'b2', 'C', '2023-02-01 00:00:00');
INSERT INTO affected_public_key VALUES ('t2', 'C', 'BasicTransferOutput'), ('t2', 'A', 'BasicTransferOutput');
"#,
    )
    .await;
    common::exec(&txn, "SELECT refresh_public_key_first_transaction()").await;

    assert_eq!(
        common::scalar(&txn, "SELECT COUNT(*) FROM public_key_first_transaction")
            .await
            .as_deref(),
        Some("3")
    );
    assert_eq!(first_seen(&txn, "C").await.as_deref(), Some("2023-02-01 200"));
    assert_eq!(first_seen(&txn, "A").await.as_deref(), Some("2023-01-01 100"));

    txn.rollback().await.unwrap();
}

/// Keys whose first appearance lands at or below the watermark after a top-up
/// are never picked up; the procedure is additive only.
#[tokio::test]
async fn top_up_skips_late_arrivals_below_watermark() {
    let Some(txn) = common::isolated().await else {
        return;
    };
    common::create_chain_tables(&txn).await;
    common::exec(
        &txn,
        r#"
INSERT INTO block VALUES ('b2', 200, '2023-02-01 00:00:00');
INSERT INTO transaction (transaction_hash, block_hash, public_key, timestamp) VALUES ('t2', 'b2', 'A', '2023-02-01 00:00:00');
INSERT INTO affected_public_key VALUES ('t2', 'A', 'BasicTransferOutput');
"#,
    )
    .await;
    common::install(&txn, &helpers::first_transaction_objects()).await;

    common::exec(
        &txn,
        r#"
INSERT INTO block VALUES ('b1', 100, '2023-01-01 00:00:00');
INSERT INTO transaction (transaction_hash, block_hash, public_key, timestamp) VALUES ('t1', 'b1', 'D', '2023-01-01 00:00:00');
INSERT INTO affected_public_key VALUES ('t1', 'D', 'BasicTransferOutput');
"#,
    )
    .await;
    common::exec(&txn, "SELECT refresh_public_key_first_transaction()").await;

    assert_eq!(first_seen(&txn, "D").await, None);

    txn.rollback().await.unwrap();
}
