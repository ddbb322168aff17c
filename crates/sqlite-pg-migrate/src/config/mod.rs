//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;
pub use validation::MAX_BATCH_SIZE;

use crate::error::{MigrateError, Result};
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables.
    ///
    /// Recognizes the variable names the original loader script used:
    /// `SQLITE_DB_NAME`, `DB_NAME`, `DB_USER`, `DB_PASSWORD`, `DB_HOST`,
    /// `DB_PORT` and the optional `ROW_COUNT_RESTRICT` batch size.
    /// All missing variables are reported together.
    pub fn from_env() -> Result<Self> {
        let mut missing = Vec::new();
        let mut var = |name: &'static str| -> String {
            match std::env::var(name) {
                Ok(v) if !v.is_empty() => v,
                _ => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let path = var("SQLITE_DB_NAME");
        let database = var("DB_NAME");
        let user = var("DB_USER");
        let password = var("DB_PASSWORD");
        let host = var("DB_HOST");
        let port_raw = var("DB_PORT");

        if !missing.is_empty() {
            return Err(MigrateError::Config(format!(
                "missing environment variables: {}",
                missing.join(", ")
            )));
        }

        let port: u16 = port_raw
            .parse()
            .map_err(|_| MigrateError::Config(format!("DB_PORT is not a valid port: {port_raw}")))?;

        let mut migration = MigrationConfig::default();
        if let Ok(raw) = std::env::var("ROW_COUNT_RESTRICT") {
            migration.batch_size = raw.parse().map_err(|_| {
                MigrateError::Config(format!(
                    "ROW_COUNT_RESTRICT is not a valid batch size: {raw}"
                ))
            })?;
        }

        let config = Config {
            source: SourceConfig { path },
            target: TargetConfig {
                host,
                port,
                database,
                user,
                password,
            },
            migration,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl TargetConfig {
    /// Build a connection string for tokio-postgres.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} dbname={} user={} password={}",
            self.host, self.port, self.database, self.user, self.password
        )
    }
}
