//! PostgreSQL target access.
//!
//! Writes go through a single connection so the whole run can share one
//! transaction. Batches are inserted with one multi-row statement per page,
//! skipping rows whose primary key already exists.

use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, GenericClient, NoTls, Transaction};
use tracing::{error, info};

use crate::config::TargetConfig;
use crate::error::{MigrateError, Result};
use crate::model::Record;

/// Connection to the target database.
pub struct PgTarget {
    client: Client,
}

impl PgTarget {
    /// Connect and probe the target database.
    pub async fn connect(config: &TargetConfig) -> Result<Self> {
        let (client, connection) =
            tokio_postgres::connect(&config.connection_string(), NoTls).await?;

        // The connection object drives the socket; it runs until the client
        // is dropped.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "target connection closed with error");
            }
        });

        client.simple_query("SELECT 1").await?;
        info!(
            host = %config.host,
            database = %config.database,
            "connected to target database"
        );
        Ok(Self { client })
    }

    /// Begin a transaction on the underlying connection.
    pub async fn transaction(&mut self) -> Result<Transaction<'_>> {
        Ok(self.client.transaction().await?)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Total row count of a table, on any client or open transaction.
pub async fn count<C: GenericClient>(client: &C, table: &str) -> Result<i64> {
    let sql = format!("SELECT COUNT(id) FROM {table}");
    let row = client.query_one(&sql, &[]).await?;
    Ok(row.get(0))
}

/// Write one batch of records with a single multi-row insert.
///
/// Rows whose `id` already exists in the target are skipped, making the
/// write idempotent across reruns. Returns the number of rows actually
/// inserted; an empty batch is a no-op.
pub async fn write_batch<R: Record, C: GenericClient>(client: &C, batch: &[R]) -> Result<u64> {
    if batch.is_empty() {
        return Ok(0);
    }

    let sql = insert_statement(R::TABLE, R::COLUMNS, batch.len());
    let mut params: Vec<&(dyn ToSql + Sync)> =
        Vec::with_capacity(batch.len() * R::COLUMNS.len());
    for record in batch {
        params.extend(record.params());
    }

    client
        .execute(&sql, &params)
        .await
        .map_err(|e| MigrateError::target_write(R::TABLE, e))
}

/// Build a multi-row `INSERT ... ON CONFLICT (id) DO NOTHING` statement.
fn insert_statement(table: &str, columns: &[&str], rows: usize) -> String {
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, columns.join(", "));
    for row in 0..rows {
        if row > 0 {
            sql.push_str(", ");
        }
        sql.push('(');
        for col in 0..columns.len() {
            if col > 0 {
                sql.push_str(", ");
            }
            sql.push('$');
            sql.push_str(&(row * columns.len() + col + 1).to_string());
        }
        sql.push(')');
    }
    sql.push_str(" ON CONFLICT (id) DO NOTHING");
    sql
}
