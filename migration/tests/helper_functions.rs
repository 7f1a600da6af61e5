mod common;

use migration::catalog::{case_table, helpers, profile::DIAMOND_LEVEL_NANOS};
use migration::sea_orm::{ConnectionTrait, TransactionTrait};
use migration::MigrationError;

#[tokio::test]
async fn sell_value_laws() {
    let Some(txn) = common::isolated().await else {
        return;
    };
    common::install(&txn, &helpers::function_objects()).await;

    let zero = common::scalar(&txn, "cc_nanos_total_sell_value(0, 5000, 1000) = 0").await;
    assert_eq!(zero.as_deref(), Some("true"));

    let everything = common::scalar(
        &txn,
        "cc_nanos_total_sell_value(1000, 5000, 1000) = 5000 * (10000 - 100) / 10000.0",
    )
    .await;
    assert_eq!(everything.as_deref(), Some("true"));

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn transaction_count_rejects_out_of_range_kinds() {
    let Some(txn) = common::isolated().await else {
        return;
    };
    common::install(&txn, &helpers::function_objects()).await;

    for kind in [0, 34] {
        let savepoint = txn.begin().await.unwrap();
        let err = savepoint
            .execute_unprepared(&format!("SELECT get_transaction_count({})", kind))
            .await
            .unwrap_err();
        assert!(
            matches!(MigrationError::classify(&err), MigrationError::InvalidArgument(_)),
            "{}: {}",
            kind,
            err
        );
        savepoint.rollback().await.unwrap();
    }

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn hex_quantities_decode() {
    let Some(txn) = common::isolated().await else {
        return;
    };
    common::install(&txn, &helpers::function_objects()).await;

    assert_eq!(
        common::scalar(&txn, "hex_to_numeric('0x0a')").await.as_deref(),
        Some("10")
    );
    // 2^128 does not fit any integer type
    assert_eq!(
        common::scalar(&txn, "hex_to_numeric('0x100000000000000000000000000000000')")
            .await
            .as_deref(),
        Some("340282366920938463463374607431768211456")
    );
    assert_eq!(common::scalar(&txn, "hex_to_numeric(NULL)").await, None);

    txn.rollback().await.unwrap();
}

#[tokio::test]
async fn unknown_diamond_level_is_null() {
    let Some(txn) = common::isolated().await else {
        return;
    };

    let tiers = case_table("diamond_level", &DIAMOND_LEVEL_NANOS);
    let unknown = common::scalar(
        &txn,
        &format!("SELECT {} FROM (SELECT 9 AS diamond_level) d", tiers),
    )
    .await;
    assert_eq!(unknown, None);

    let top = common::scalar(
        &txn,
        &format!("SELECT {} FROM (SELECT 8 AS diamond_level) d", tiers),
    )
    .await;
    assert_eq!(top.as_deref(), Some("450000000000"));

    txn.rollback().await.unwrap();
}
