//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Upper bound on rows per insert statement. Each row binds every column of
/// its table, and PostgreSQL caps a statement at 65535 bind parameters.
pub const MAX_BATCH_SIZE: usize = 5000;

/// Validate the configuration. Runs once at startup, before any I/O.
pub fn validate(config: &Config) -> Result<()> {
    // Source validation
    if config.source.path.is_empty() {
        return Err(MigrateError::Config("source.path is required".into()));
    }

    // Target validation
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }

    // Migration config validation
    if config.migration.batch_size == 0 {
        return Err(MigrateError::Config(
            "migration.batch_size must be at least 1".into(),
        ));
    }
    if config.migration.batch_size > MAX_BATCH_SIZE {
        return Err(MigrateError::Config(format!(
            "migration.batch_size must be at most {}",
            MAX_BATCH_SIZE
        )));
    }

    Ok(())
}
