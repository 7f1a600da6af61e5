#![allow(dead_code)]

//! Shared setup for tests that need a live Postgres.
//!
//! Every test runs inside one transaction with its own schema on the search
//! path and rolls back at the end, so nothing leaks into the database.

use migration::catalog::CatalogObject;
use migration::retry::RetryPolicy;
use migration::schema::run_statements;
use migration::sea_orm::{
    ConnectionTrait, Database, DatabaseTransaction, DbBackend, Statement, TransactionTrait,
};
use std::time::Duration;

/// Opens an isolated transaction, or `None` when `TEST_DATABASE_URL` is unset
pub async fn isolated() -> Option<DatabaseTransaction> {
    let url = std::env::var("TEST_DATABASE_URL").ok()?;
    let db = Database::connect(&url)
        .await
        .expect("connect to TEST_DATABASE_URL");
    let txn = db.begin().await.expect("begin");
    txn.execute_unprepared("CREATE SCHEMA statistics_test")
        .await
        .expect("create test schema");
    txn.execute_unprepared("SET LOCAL search_path TO statistics_test")
        .await
        .expect("set search path");
    Some(txn)
}

pub fn single_attempt() -> RetryPolicy {
    RetryPolicy::with_config(1, Duration::ZERO, Duration::from_secs(60))
}

pub async fn exec(txn: &DatabaseTransaction, sql: &str) {
    txn.execute_unprepared(sql)
        .await
        .unwrap_or_else(|e| panic!("{}: {}", sql, e));
}

pub async fn install(txn: &DatabaseTransaction, objects: &[CatalogObject]) {
    for object in objects {
        run_statements(txn, &single_attempt(), object.name, &object.create_statements())
            .await
            .unwrap_or_else(|e| panic!("installing {}: {}", object.name, e));
    }
}

/// Evaluates `expression` and returns it rendered as text
pub async fn scalar(txn: &DatabaseTransaction, expression: &str) -> Option<String> {
    let row = txn
        .query_one(Statement::from_string(
            DbBackend::Postgres,
            format!("SELECT ({})::TEXT AS value", expression),
        ))
        .await
        .unwrap_or_else(|e| panic!("{}: {}", expression, e))
        .expect("one row");
    row.try_get::<Option<String>>("", "value").expect("text value")
}

/// Minimal explorer tables the first-transaction bootstrap reads
pub async fn create_chain_tables(txn: &DatabaseTransaction) {
    exec(
        txn,
        "CREATE TABLE block (block_hash TEXT PRIMARY KEY, height BIGINT, timestamp TIMESTAMP)",
    )
    .await;
    exec(
        txn,
        "CREATE TABLE transaction (transaction_hash TEXT PRIMARY KEY, block_hash TEXT, public_key TEXT, fee_nanos BIGINT, timestamp TIMESTAMP, tx_index_metadata JSONB, txn_meta JSONB)",
    )
    .await;
    exec(
        txn,
        "CREATE TABLE affected_public_key (transaction_hash TEXT, public_key TEXT, metadata TEXT)",
    )
    .await;
}
