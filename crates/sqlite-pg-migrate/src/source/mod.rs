//! SQLite source access.
//!
//! Rows are fetched in pages with `LIMIT ?1 OFFSET ?2` so no table is held
//! in memory whole. The source database is opened read-only and is not
//! written to at any point.

use rusqlite::{Connection, OpenFlags};
use std::marker::PhantomData;
use std::path::Path;
use tracing::debug;

use crate::error::{MigrateError, Result};
use crate::model::Record;

/// Read-only handle to the source database.
#[derive(Debug)]
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open the source database file.
    ///
    /// A missing file is a configuration problem caught before any transfer
    /// work starts, not a read failure.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MigrateError::Config(format!(
                "source database not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|e| {
                MigrateError::Config(format!("cannot open source database: {e}"))
            })?;
        debug!(path = %path.display(), "opened source database");
        Ok(Self { conn })
    }

    /// Total row count of a table.
    pub fn count(&self, table: &str) -> Result<i64> {
        // Table names come from the fixed transfer order, never from input.
        let sql = format!("SELECT COUNT(id) FROM {table}");
        self.conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(|e| MigrateError::source_read(table, e))
    }

    /// Whether a table exists in the source database.
    pub fn has_table(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .map_err(|e| MigrateError::source_read(table, e))?;
        Ok(count > 0)
    }

    /// Iterate over a table in pages of up to `page_size` typed records.
    ///
    /// Each item is one page. A read error ends the iteration after being
    /// yielded; the iterator is fused. Pagination is not explicitly ordered
    /// and relies on SQLite's stable scan order for a database that is not
    /// concurrently modified.
    pub fn pages<R: Record>(&self, page_size: usize) -> Pages<'_, R> {
        Pages {
            conn: &self.conn,
            page_size,
            offset: 0,
            done: false,
            _record: PhantomData,
        }
    }
}

/// Paged iterator over one source table. See [`SqliteSource::pages`].
pub struct Pages<'a, R> {
    conn: &'a Connection,
    page_size: usize,
    offset: usize,
    done: bool,
    _record: PhantomData<R>,
}

impl<R: Record> Iterator for Pages<'_, R> {
    type Item = Result<Vec<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match fetch_page::<R>(self.conn, self.page_size, self.offset) {
            Ok(page) => {
                if page.is_empty() {
                    self.done = true;
                    return None;
                }
                if page.len() < self.page_size {
                    self.done = true;
                }
                self.offset += page.len();
                Some(Ok(page))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Record> std::iter::FusedIterator for Pages<'_, R> {}

fn fetch_page<R: Record>(conn: &Connection, limit: usize, offset: usize) -> Result<Vec<R>> {
    let sql = format!("SELECT * FROM {} LIMIT ?1 OFFSET ?2", R::TABLE);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| MigrateError::source_read(R::TABLE, e))?;
    let mut rows = stmt
        .query(rusqlite::params![limit as i64, offset as i64])
        .map_err(|e| MigrateError::source_read(R::TABLE, e))?;

    let mut page = Vec::with_capacity(limit);
    while let Some(row) = rows
        .next()
        .map_err(|e| MigrateError::source_read(R::TABLE, e))?
    {
        page.push(R::from_sqlite_row(row)?);
    }
    Ok(page)
}
