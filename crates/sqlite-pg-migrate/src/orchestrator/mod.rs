//! Migration orchestration.
//!
//! Tables move in a fixed order (entities before the join tables that
//! reference them), each table in pages, every page written before the next
//! one is read. Transfer and verification run inside a single target
//! transaction: the target only ever shows nothing or the complete,
//! verified dataset.
//!
//! Note: the run future is not `Send` (the source connection is not `Sync`),
//! so it must be awaited directly rather than spawned onto a runtime.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Transaction;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::model::{self, FilmWork, Genre, GenreFilmWork, Person, PersonFilmWork, Record};
use crate::source::SqliteSource;
use crate::target::{self, PgTarget};
use crate::verify::Verifier;

/// Coordinates the full migration between the two stores.
pub struct Orchestrator {
    config: Config,
    source: SqliteSource,
    target: PgTarget,
}

impl Orchestrator {
    /// Validate the configuration and open both databases.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = SqliteSource::open(&config.source.path)?;
        let target = PgTarget::connect(&config.target).await?;
        Ok(Self {
            config,
            source,
            target,
        })
    }

    /// Run the migration: transfer every table, verify the result, commit.
    ///
    /// Any failure after the transaction opens rolls everything back; the
    /// error is returned unchanged after the rollback is logged.
    pub async fn run(&mut self) -> Result<MigrationResult> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let batch_size = self.config.migration.batch_size;
        info!(%run_id, batch_size, "migration started");

        let tx = self.target.transaction().await?;
        match transfer_and_verify(&self.source, &tx, batch_size).await {
            Ok(tables) => {
                tx.commit().await?;
                let completed_at = Utc::now();
                let rows_transferred = tables.iter().map(|t| t.rows).sum();
                info!(%run_id, rows_transferred, "migration committed");
                Ok(MigrationResult {
                    run_id,
                    status: "success".to_string(),
                    started_at,
                    completed_at,
                    duration_seconds: (completed_at - started_at).num_milliseconds() as f64
                        / 1000.0,
                    rows_transferred,
                    tables,
                })
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "rollback failed");
                }
                error!(%run_id, error = %e, "migration rolled back");
                Err(e)
            }
        }
    }

    /// Verify committed target state against the source, without writing.
    pub async fn verify(&self) -> Result<()> {
        Verifier::new(&self.source, self.config.migration.batch_size)
            .verify_all(self.target.client())
            .await
    }

    /// Compare per-table row counts between the source and committed target
    /// state, without looking at contents.
    pub async fn validate(&self) -> Result<Vec<CountReport>> {
        let mut reports = Vec::with_capacity(model::TABLE_ORDER.len());
        for table in model::TABLE_ORDER {
            let source_rows = self.source.count(table)?;
            let target_rows = target::count(self.target.client(), table).await?;
            reports.push(CountReport {
                table: table.to_string(),
                source_rows,
                target_rows,
            });
        }
        Ok(reports)
    }

    /// Check that both databases are reachable and the source carries all
    /// expected tables.
    pub async fn health_check(&self) -> Result<()> {
        for table in model::TABLE_ORDER {
            if !self.source.has_table(table)? {
                return Err(MigrateError::Config(format!(
                    "source database is missing table {table}"
                )));
            }
        }
        self.target.client().simple_query("SELECT 1").await?;
        Ok(())
    }
}

async fn transfer_and_verify(
    source: &SqliteSource,
    tx: &Transaction<'_>,
    batch_size: usize,
) -> Result<Vec<TableReport>> {
    let mut tables = Vec::with_capacity(model::TABLE_ORDER.len());
    tables.push(transfer_table::<Genre>(source, tx, batch_size).await?);
    tables.push(transfer_table::<Person>(source, tx, batch_size).await?);
    tables.push(transfer_table::<FilmWork>(source, tx, batch_size).await?);
    tables.push(transfer_table::<GenreFilmWork>(source, tx, batch_size).await?);
    tables.push(transfer_table::<PersonFilmWork>(source, tx, batch_size).await?);

    Verifier::new(source, batch_size).verify_all(tx).await?;
    Ok(tables)
}

/// Move one table page by page inside the open transaction.
async fn transfer_table<R: Record>(
    source: &SqliteSource,
    tx: &Transaction<'_>,
    batch_size: usize,
) -> Result<TableReport> {
    let mut rows: u64 = 0;
    let mut pages: u64 = 0;
    for page in source.pages::<R>(batch_size) {
        let page = page?;
        rows += page.len() as u64;
        pages += 1;
        target::write_batch::<R, _>(tx, &page).await?;
    }
    info!(table = R::TABLE, rows, pages, "table transferred");
    Ok(TableReport {
        table: R::TABLE.to_string(),
        rows,
        pages,
    })
}

/// Summary of a committed migration run.
#[derive(Debug, Serialize)]
pub struct MigrationResult {
    pub run_id: Uuid,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub rows_transferred: u64,
    pub tables: Vec<TableReport>,
}

impl MigrationResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Per-table transfer counters.
#[derive(Debug, Serialize)]
pub struct TableReport {
    pub table: String,
    pub rows: u64,
    pub pages: u64,
}

/// Per-table row count comparison from [`Orchestrator::validate`].
#[derive(Debug, Serialize)]
pub struct CountReport {
    pub table: String,
    pub source_rows: i64,
    pub target_rows: i64,
}

impl CountReport {
    pub fn matches(&self) -> bool {
        self.source_rows == self.target_rows
    }
}
