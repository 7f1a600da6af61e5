use std::env;

use crate::error::MigrationError;

/// Coordinates of the publisher database the subscriber's foreign server points at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Publisher host
    pub host: String,
    /// Publisher port
    pub port: u16,
    /// Publisher database name
    pub dbname: String,
    /// Role the user mapping logs in as
    pub user: String,
    /// Password for that role
    pub password: String,
}

impl PublisherConfig {
    /// Load publisher coordinates from `DB_HOST`, `DB_PORT`, `DB_NAME`, `DB_USERNAME` and `DB_PASSWORD`
    pub fn from_env() -> Result<Self, MigrationError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MigrationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| {
                    MigrationError::Config(format!("{} environment variable not set", key))
                })
        };

        let port = require("DB_PORT")?;
        let port = port.parse::<u16>().map_err(|_| {
            MigrationError::Config(format!("DB_PORT must be a port number, got '{}'", port))
        })?;

        Ok(Self {
            host: require("DB_HOST")?,
            port,
            dbname: require("DB_NAME")?,
            user: require("DB_USERNAME")?,
            password: require("DB_PASSWORD")?,
        })
    }
}
