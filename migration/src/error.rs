// Error types surfaced by the statistics migrations

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::RuntimeErr;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while installing, rolling back or refreshing the statistics schema
#[derive(Debug, Error)]
pub enum MigrationError {
    /// A block failed on every allowed attempt
    #[error("{label} failed after {attempts} attempts")]
    RetryExhausted { label: String, attempts: u32 },

    /// The block did not finish before its deadline
    #[error("{label} did not complete within {deadline:?}")]
    DeadlineExceeded { label: String, deadline: Duration },

    /// A helper function rejected its input (SQLSTATE 22023)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Syntax or definition error in the submitted DDL
    #[error("DDL error: {0}")]
    Ddl(String),

    /// The object already exists, usually because bookkeeping was lost
    #[error("Duplicate object: {0}")]
    DuplicateObject(String),

    /// A referenced relation or function does not exist
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Anything else the server reported: lock timeouts, deadlocks, dropped connections
    #[error("Transient database error: {0}")]
    Transient(String),

    /// The derived-object catalog violates one of its invariants
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MigrationError {
    /// Maps a driver error onto the taxonomy using its SQLSTATE code
    pub fn classify(err: &DbErr) -> Self {
        let message = err.to_string();
        match sqlstate(err) {
            Some(code) => Self::from_sqlstate(&code, message),
            None => MigrationError::Transient(message),
        }
    }

    pub fn from_sqlstate(code: &str, message: String) -> Self {
        match code {
            "22023" => MigrationError::InvalidArgument(message),
            "42601" | "42P16" | "42P17" | "42804" | "42703" | "42803" => {
                MigrationError::Ddl(message)
            }
            "42P07" | "42710" | "42723" | "42P06" => MigrationError::DuplicateObject(message),
            "42P01" | "42883" | "3F000" | "42704" => MigrationError::MissingDependency(message),
            _ => MigrationError::Transient(message),
        }
    }
}

/// Extracts the Postgres SQLSTATE code from a driver error, if any
pub fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Exec(runtime) | DbErr::Query(runtime) | DbErr::Conn(runtime) => runtime,
        _ => return None,
    };

    match runtime {
        RuntimeErr::SqlxError(sqlx_err) => sqlx_err
            .as_database_error()
            .and_then(|db_err| db_err.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}

impl From<MigrationError> for DbErr {
    fn from(err: MigrationError) -> Self {
        DbErr::Migration(err.to_string())
    }
}
