//! Error types for the migration library.

use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Configuration error (invalid YAML, missing fields, missing source file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Source database query failure.
    #[error("Source read failed for table {table}: {source}")]
    SourceRead {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A fetched row could not be mapped to its typed record.
    #[error("Row conversion failed for table {table}: {reason}")]
    Conversion { table: String, reason: String },

    /// Target database insert failure not covered by conflict-skip.
    #[error("Target write failed for table {table}: {source}")]
    TargetWrite {
        table: String,
        #[source]
        source: tokio_postgres::Error,
    },

    /// Post-transfer count or content mismatch for a named table.
    #[error("Verification failed for table {table}: {reason}")]
    Verification { table: String, reason: String },

    /// Target connection or transaction error outside a table write.
    #[error("Target database error: {0}")]
    Target(#[from] tokio_postgres::Error),

    /// IO error (file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MigrateError {
    /// Create a SourceRead error for a table.
    pub fn source_read(table: impl Into<String>, source: rusqlite::Error) -> Self {
        MigrateError::SourceRead {
            table: table.into(),
            source,
        }
    }

    /// Create a Conversion error for a table.
    pub fn conversion(table: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrateError::Conversion {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create a TargetWrite error for a table.
    pub fn target_write(table: impl Into<String>, source: tokio_postgres::Error) -> Self {
        MigrateError::TargetWrite {
            table: table.into(),
            source,
        }
    }

    /// Create a Verification error for a table.
    pub fn verification(table: impl Into<String>, reason: impl Into<String>) -> Self {
        MigrateError::Verification {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            MigrateError::Config(_) | MigrateError::Yaml(_) => 1,
            MigrateError::SourceRead { .. } => 2,
            MigrateError::Conversion { .. } => 3,
            MigrateError::TargetWrite { .. } | MigrateError::Target(_) => 4,
            MigrateError::Verification { .. } => 5,
            MigrateError::Json(_) => 6,
            MigrateError::Io(_) => 7,
        }
    }

    /// Format error with full details including error chain.
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
