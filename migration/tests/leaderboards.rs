mod common;

use migration::catalog::{helpers, leaderboards, BASE_COIN_PKID};

async fn create_partition(txn: &migration::sea_orm::DatabaseTransaction, partition: &str) {
    common::exec(
        txn,
        &format!(
            "CREATE TABLE transaction_partition_{} (transaction_hash TEXT PRIMARY KEY, public_key TEXT, timestamp TIMESTAMP, tx_index_metadata JSONB, txn_meta JSONB)",
            partition
        ),
    )
    .await;
}

#[tokio::test]
async fn social_leaderboard_is_capped_at_ten() {
    let Some(txn) = common::isolated().await else {
        return;
    };
    for partition in ["02", "05", "10", "29"] {
        create_partition(&txn, partition).await;
    }
    common::exec(&txn, "CREATE TABLE post_entry (post_hash TEXT PRIMARY KEY, poster_public_key TEXT)").await;
    common::exec(&txn, "CREATE TABLE profile_entry (public_key TEXT PRIMARY KEY, pkid TEXT, username TEXT)").await;

    for i in 0..15 {
        common::exec(
            &txn,
            &format!(
                r#"
INSERT INTO post_entry VALUES ('post{i}', 'poster{i}');
INSERT INTO profile_entry VALUES ('poster{i}', 'pkid{i}', 'user{i}');
INSERT INTO transaction_partition_10 VALUES (
    'like{i}', 'liker', NOW() - INTERVAL '1 day',
    '{{"PostHashHex": "post{i}", "IsUnlike": "false"}}'::JSONB, '{{}}'::JSONB
);"#,
                i = i
            ),
        )
        .await;
    }

    let social: Vec<_> = leaderboards::objects()
        .into_iter()
        .filter(|o| o.name.starts_with("statistic_social_leaderboard"))
        .collect();
    assert_eq!(social.len(), 6);
    common::install(&txn, &social).await;

    assert_eq!(
        common::scalar(&txn, "SELECT COUNT(*) FROM statistic_social_leaderboard_likes")
            .await
            .as_deref(),
        Some("10")
    );
    assert_eq!(
        common::scalar(&txn, "SELECT COUNT(*) FROM statistic_social_leaderboard")
            .await
            .as_deref(),
        Some("10")
    );
    assert_eq!(
        common::scalar(&txn, "SELECT MAX(total_count) FROM statistic_social_leaderboard")
            .await
            .as_deref(),
        Some("1")
    );

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn defi_score_ignores_cancelled_orders() {
    let Some(txn) = common::isolated().await else {
        return;
    };
    common::install(&txn, &helpers::function_objects()).await;
    create_partition(&txn, "26").await;
    common::exec(
        &txn,
        "CREATE TABLE dao_coin_limit_order_entry (order_id TEXT PRIMARY KEY, quantity_to_fill_in_base_units_numeric NUMERIC)",
    )
    .await;

    let order = |hash: &str, meta: &str| {
        format!(
            r#"INSERT INTO transaction_partition_26 VALUES (
    '{hash}', 'buyer', NOW() - INTERVAL '1 day',
    '{{"SellingDAOCoinCreatorPublicKey": "{base}"}}'::JSONB,
    '{{"OperationType": "2", {meta}}}'::JSONB
)"#,
            hash = hash,
            base = BASE_COIN_PKID,
            meta = meta
        )
    };
    let rate = r#""ScaledExchangeRateCoinsToSellPerCoinToBuy": "0x4b3b4ca85a86c47a098a224000000000""#;

    common::exec(
        &txn,
        &order(
            "limit",
            &format!(r#""FillType": "1", "QuantityToFillInBaseUnits": "0x64", {}"#, rate),
        ),
    )
    .await;
    // a cancel carries only the order id, no buy side
    common::exec(
        &txn,
        r#"INSERT INTO transaction_partition_26 VALUES (
    'cancel', 'buyer', NOW() - INTERVAL '1 day',
    '{}'::JSONB,
    '{"OperationType": "0", "CancelOrderID": "limit"}'::JSONB
)"#,
    )
    .await;
    common::exec(
        &txn,
        &order(
            "market",
            &format!(r#""FillType": "2", "QuantityToFillInBaseUnits": "0x64", {}"#, rate),
        ),
    )
    .await;

    let defi: Vec<_> = leaderboards::objects()
        .into_iter()
        .filter(|o| o.name == "statistic_defi_leaderboard")
        .collect();
    common::install(&txn, &defi).await;

    assert_eq!(
        common::scalar(
            &txn,
            "SELECT score FROM statistic_defi_leaderboard WHERE buying_public_key = 'buyer'"
        )
        .await
        .as_deref(),
        Some("100")
    );

    txn.rollback().await.unwrap();
}
