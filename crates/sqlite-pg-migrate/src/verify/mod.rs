//! Post-transfer verification.
//!
//! Every table is checked in two passes: row count parity first, then full
//! content equality record by record. Records compare as typed values, so a
//! timestamp stored as `+00` in the source and returned as `+00:00` by the
//! target still matches as the same instant.
//!
//! The verifier is generic over the client so it can run inside the
//! migration's own transaction (seeing uncommitted writes) or against
//! committed state afterwards.

use std::collections::HashMap;
use tokio_postgres::GenericClient;
use tracing::debug;
use uuid::Uuid;

use crate::error::{MigrateError, Result};
use crate::model::{FilmWork, Genre, GenreFilmWork, Person, PersonFilmWork, Record};
use crate::source::SqliteSource;
use crate::target;

/// Compares source and target table contents.
pub struct Verifier<'a> {
    source: &'a SqliteSource,
    page_size: usize,
}

impl<'a> Verifier<'a> {
    pub fn new(source: &'a SqliteSource, page_size: usize) -> Self {
        Self { source, page_size }
    }

    /// Verify all migrated tables, failing on the first mismatch.
    pub async fn verify_all<C: GenericClient>(&self, client: &C) -> Result<()> {
        self.verify_table::<Genre, C>(client).await?;
        self.verify_table::<Person, C>(client).await?;
        self.verify_table::<FilmWork, C>(client).await?;
        self.verify_table::<GenreFilmWork, C>(client).await?;
        self.verify_table::<PersonFilmWork, C>(client).await?;
        Ok(())
    }

    /// Verify one table: counts first, then per-record equality keyed by id.
    async fn verify_table<R: Record, C: GenericClient>(&self, client: &C) -> Result<()> {
        let source_count = self.source.count(R::TABLE)?;
        let target_count = target::count(client, R::TABLE).await?;
        if source_count != target_count {
            return Err(MigrateError::verification(
                R::TABLE,
                format!("row count mismatch: source has {source_count}, target has {target_count}"),
            ));
        }

        let sql = format!("SELECT {} FROM {}", R::COLUMNS.join(", "), R::TABLE);
        let rows = client.query(&sql, &[]).await?;
        let mut target_by_id: HashMap<Uuid, R> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let record = R::from_pg_row(row)?;
            target_by_id.insert(record.id(), record);
        }

        for page in self.source.pages::<R>(self.page_size) {
            for record in page? {
                match target_by_id.get(&record.id()) {
                    None => {
                        return Err(MigrateError::verification(
                            R::TABLE,
                            format!("row {} missing from target", record.id()),
                        ));
                    }
                    Some(written) if *written != record => {
                        return Err(MigrateError::verification(
                            R::TABLE,
                            format!("row {} differs between source and target", record.id()),
                        ));
                    }
                    _ => {}
                }
            }
        }

        debug!(table = R::TABLE, rows = source_count, "table verified");
        Ok(())
    }
}
