//! Typed records for the five migrated tables.
//!
//! Each record owns its `id` and timestamp fields directly (composition
//! instead of the source system's abstract-base mixins). Records are
//! immutable once constructed: the pipeline builds them from a source row,
//! writes them, and compares them during verification, but never mutates
//! them.

mod time;

pub use time::parse_timestamp;

use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, NaiveDate};
use std::str::FromStr;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};
use uuid::Uuid;

use crate::error::{MigrateError, Result};

/// Tables in dependency-respecting transfer order: referenced entities
/// before the join tables that point at them.
pub const TABLE_ORDER: &[&str] = &[
    "genre",
    "person",
    "film_work",
    "genre_film_work",
    "person_film_work",
];

/// A typed, immutable representation of one source row.
///
/// The trait is the seam between the two stores: `from_sqlite_row` builds a
/// record from a source row, `params` binds it into a bulk insert, and
/// `from_pg_row` reads it back for verification.
pub trait Record: Sized + PartialEq + std::fmt::Debug {
    /// Table name, identical in both stores.
    const TABLE: &'static str;

    /// Column names covered by bulk inserts, in `params` order.
    const COLUMNS: &'static [&'static str];

    /// Construct from a SQLite row. Missing or mistyped fields fail with
    /// [`MigrateError::Conversion`].
    fn from_sqlite_row(row: &rusqlite::Row<'_>) -> Result<Self>;

    /// Construct from a PostgreSQL row (verification pass).
    fn from_pg_row(row: &tokio_postgres::Row) -> Result<Self>;

    /// Primary key.
    fn id(&self) -> Uuid;

    /// Bind parameters for one row of a bulk insert, in `COLUMNS` order.
    fn params(&self) -> Vec<&(dyn ToSql + Sync)>;
}

/// Film work classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilmWorkKind {
    Movie,
    TvShow,
}

impl FilmWorkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilmWorkKind::Movie => "movie",
            FilmWorkKind::TvShow => "tv_show",
        }
    }
}

impl FromStr for FilmWorkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "movie" => Ok(FilmWorkKind::Movie),
            "tv_show" => Ok(FilmWorkKind::TvShow),
            other => Err(format!("unknown film work type '{other}'")),
        }
    }
}

impl ToSql for FilmWorkKind {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.as_str().to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <&str as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

/// Role a person played in a film work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersonRole {
    Actor,
    Director,
    Writer,
}

impl PersonRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonRole::Actor => "actor",
            PersonRole::Director => "director",
            PersonRole::Writer => "writer",
        }
    }
}

impl FromStr for PersonRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "actor" => Ok(PersonRole::Actor),
            "director" => Ok(PersonRole::Director),
            "writer" => Ok(PersonRole::Writer),
            other => Err(format!("unknown person role '{other}'")),
        }
    }
}

impl ToSql for PersonRole {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        self.as_str().to_sql(ty, out)
    }

    fn accepts(ty: &Type) -> bool {
        <&str as ToSql>::accepts(ty)
    }

    to_sql_checked!();
}

/// Film genre.
#[derive(Debug, Clone, PartialEq)]
pub struct Genre {
    pub id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub name: String,
    pub description: Option<String>,
}

impl Record for Genre {
    const TABLE: &'static str = "genre";
    const COLUMNS: &'static [&'static str] =
        &["id", "created_at", "updated_at", "name", "description"];

    fn from_sqlite_row(row: &rusqlite::Row<'_>) -> Result<Self> {
        Ok(Self {
            id: sq_uuid(Self::TABLE, row, "id")?,
            created_at: sq_timestamp(Self::TABLE, row, "created_at")?,
            updated_at: sq_timestamp(Self::TABLE, row, "updated_at")?,
            name: sq(Self::TABLE, row, "name")?,
            description: sq(Self::TABLE, row, "description")?,
        })
    }

    fn from_pg_row(row: &tokio_postgres::Row) -> Result<Self> {
        Ok(Self {
            id: pg(Self::TABLE, row, "id")?,
            created_at: pg(Self::TABLE, row, "created_at")?,
            updated_at: pg(Self::TABLE, row, "updated_at")?,
            name: pg(Self::TABLE, row, "name")?,
            description: pg(Self::TABLE, row, "description")?,
        })
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        vec![
            &self.id,
            &self.created_at,
            &self.updated_at,
            &self.name,
            &self.description,
        ]
    }
}

/// Person (actor, director or writer across film works).
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub full_name: String,
}

impl Record for Person {
    const TABLE: &'static str = "person";
    const COLUMNS: &'static [&'static str] = &["id", "created_at", "updated_at", "full_name"];

    fn from_sqlite_row(row: &rusqlite::Row<'_>) -> Result<Self> {
        Ok(Self {
            id: sq_uuid(Self::TABLE, row, "id")?,
            created_at: sq_timestamp(Self::TABLE, row, "created_at")?,
            updated_at: sq_timestamp(Self::TABLE, row, "updated_at")?,
            full_name: sq(Self::TABLE, row, "full_name")?,
        })
    }

    fn from_pg_row(row: &tokio_postgres::Row) -> Result<Self> {
        Ok(Self {
            id: pg(Self::TABLE, row, "id")?,
            created_at: pg(Self::TABLE, row, "created_at")?,
            updated_at: pg(Self::TABLE, row, "updated_at")?,
            full_name: pg(Self::TABLE, row, "full_name")?,
        })
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        vec![
            &self.id,
            &self.created_at,
            &self.updated_at,
            &self.full_name,
        ]
    }
}

/// Film work (movie or TV show).
#[derive(Debug, Clone, PartialEq)]
pub struct FilmWork {
    pub id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub title: String,
    pub description: Option<String>,
    pub creation_date: Option<NaiveDate>,
    pub file_path: Option<String>,
    pub rating: Option<f64>,
    pub kind: FilmWorkKind,
}

impl Record for FilmWork {
    const TABLE: &'static str = "film_work";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "created_at",
        "updated_at",
        "title",
        "description",
        "creation_date",
        "file_path",
        "rating",
        "type",
    ];

    fn from_sqlite_row(row: &rusqlite::Row<'_>) -> Result<Self> {
        let kind_raw: String = sq(Self::TABLE, row, "type")?;
        Ok(Self {
            id: sq_uuid(Self::TABLE, row, "id")?,
            created_at: sq_timestamp(Self::TABLE, row, "created_at")?,
            updated_at: sq_timestamp(Self::TABLE, row, "updated_at")?,
            title: sq(Self::TABLE, row, "title")?,
            description: sq(Self::TABLE, row, "description")?,
            creation_date: sq_date(Self::TABLE, row, "creation_date")?,
            file_path: sq(Self::TABLE, row, "file_path")?,
            rating: sq(Self::TABLE, row, "rating")?,
            kind: kind_raw
                .parse()
                .map_err(|e: String| MigrateError::conversion(Self::TABLE, e))?,
        })
    }

    fn from_pg_row(row: &tokio_postgres::Row) -> Result<Self> {
        let kind_raw: String = pg(Self::TABLE, row, "type")?;
        Ok(Self {
            id: pg(Self::TABLE, row, "id")?,
            created_at: pg(Self::TABLE, row, "created_at")?,
            updated_at: pg(Self::TABLE, row, "updated_at")?,
            title: pg(Self::TABLE, row, "title")?,
            description: pg(Self::TABLE, row, "description")?,
            creation_date: pg(Self::TABLE, row, "creation_date")?,
            file_path: pg(Self::TABLE, row, "file_path")?,
            rating: pg(Self::TABLE, row, "rating")?,
            kind: kind_raw
                .parse()
                .map_err(|e: String| MigrateError::conversion(Self::TABLE, e))?,
        })
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        vec![
            &self.id,
            &self.created_at,
            &self.updated_at,
            &self.title,
            &self.description,
            &self.creation_date,
            &self.file_path,
            &self.rating,
            &self.kind,
        ]
    }
}

/// Join row linking a film work to a genre. Unique on
/// (film_work_id, genre_id) in the target schema.
#[derive(Debug, Clone, PartialEq)]
pub struct GenreFilmWork {
    pub id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub film_work_id: Uuid,
    pub genre_id: Uuid,
}

impl Record for GenreFilmWork {
    const TABLE: &'static str = "genre_film_work";
    const COLUMNS: &'static [&'static str] = &["id", "created_at", "film_work_id", "genre_id"];

    fn from_sqlite_row(row: &rusqlite::Row<'_>) -> Result<Self> {
        Ok(Self {
            id: sq_uuid(Self::TABLE, row, "id")?,
            created_at: sq_timestamp(Self::TABLE, row, "created_at")?,
            film_work_id: sq_uuid(Self::TABLE, row, "film_work_id")?,
            genre_id: sq_uuid(Self::TABLE, row, "genre_id")?,
        })
    }

    fn from_pg_row(row: &tokio_postgres::Row) -> Result<Self> {
        Ok(Self {
            id: pg(Self::TABLE, row, "id")?,
            created_at: pg(Self::TABLE, row, "created_at")?,
            film_work_id: pg(Self::TABLE, row, "film_work_id")?,
            genre_id: pg(Self::TABLE, row, "genre_id")?,
        })
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        vec![
            &self.id,
            &self.created_at,
            &self.film_work_id,
            &self.genre_id,
        ]
    }
}

/// Join row linking a person to a film work with a role. The source schema
/// carries no uniqueness constraint on (film_work_id, person_id, role);
/// that asymmetry with `genre_film_work` is preserved as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonFilmWork {
    pub id: Uuid,
    pub created_at: DateTime<FixedOffset>,
    pub film_work_id: Uuid,
    pub person_id: Uuid,
    pub role: PersonRole,
}

impl Record for PersonFilmWork {
    const TABLE: &'static str = "person_film_work";
    const COLUMNS: &'static [&'static str] =
        &["id", "created_at", "film_work_id", "person_id", "role"];

    fn from_sqlite_row(row: &rusqlite::Row<'_>) -> Result<Self> {
        let role_raw: String = sq(Self::TABLE, row, "role")?;
        Ok(Self {
            id: sq_uuid(Self::TABLE, row, "id")?,
            created_at: sq_timestamp(Self::TABLE, row, "created_at")?,
            film_work_id: sq_uuid(Self::TABLE, row, "film_work_id")?,
            person_id: sq_uuid(Self::TABLE, row, "person_id")?,
            role: role_raw
                .parse()
                .map_err(|e: String| MigrateError::conversion(Self::TABLE, e))?,
        })
    }

    fn from_pg_row(row: &tokio_postgres::Row) -> Result<Self> {
        let role_raw: String = pg(Self::TABLE, row, "role")?;
        Ok(Self {
            id: pg(Self::TABLE, row, "id")?,
            created_at: pg(Self::TABLE, row, "created_at")?,
            film_work_id: pg(Self::TABLE, row, "film_work_id")?,
            person_id: pg(Self::TABLE, row, "person_id")?,
            role: role_raw
                .parse()
                .map_err(|e: String| MigrateError::conversion(Self::TABLE, e))?,
        })
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        vec![
            &self.id,
            &self.created_at,
            &self.film_work_id,
            &self.person_id,
            &self.role,
        ]
    }
}

// --- field accessors with table-scoped conversion errors ---

/// Read a SQLite column, mapping missing/mistyped columns to `Conversion`.
fn sq<T: rusqlite::types::FromSql>(table: &str, row: &rusqlite::Row<'_>, col: &str) -> Result<T> {
    row.get(col)
        .map_err(|e| MigrateError::conversion(table, format!("column {col}: {e}")))
}

fn sq_uuid(table: &str, row: &rusqlite::Row<'_>, col: &str) -> Result<Uuid> {
    let raw: String = sq(table, row, col)?;
    Uuid::parse_str(&raw)
        .map_err(|e| MigrateError::conversion(table, format!("column {col}: {e}")))
}

fn sq_timestamp(table: &str, row: &rusqlite::Row<'_>, col: &str) -> Result<DateTime<FixedOffset>> {
    let raw: String = sq(table, row, col)?;
    parse_timestamp(&raw).ok_or_else(|| {
        MigrateError::conversion(table, format!("column {col}: invalid timestamp '{raw}'"))
    })
}

fn sq_date(table: &str, row: &rusqlite::Row<'_>, col: &str) -> Result<Option<NaiveDate>> {
    let raw: Option<String> = sq(table, row, col)?;
    match raw {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| MigrateError::conversion(table, format!("column {col}: {e}"))),
    }
}

/// Read a PostgreSQL column, mapping missing/mistyped columns to `Conversion`.
fn pg<'a, T: tokio_postgres::types::FromSql<'a>>(
    table: &str,
    row: &'a tokio_postgres::Row,
    col: &str,
) -> Result<T> {
    row.try_get(col)
        .map_err(|e| MigrateError::conversion(table, format!("column {col}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_film_work_kind_round_trip() {
        assert_eq!("movie".parse::<FilmWorkKind>().unwrap(), FilmWorkKind::Movie);
        assert_eq!(
            "tv_show".parse::<FilmWorkKind>().unwrap(),
            FilmWorkKind::TvShow
        );
        assert_eq!(FilmWorkKind::Movie.as_str(), "movie");
        assert!("series".parse::<FilmWorkKind>().is_err());
    }

    #[test]
    fn test_person_role_round_trip() {
        for role in [PersonRole::Actor, PersonRole::Director, PersonRole::Writer] {
            assert_eq!(role.as_str().parse::<PersonRole>().unwrap(), role);
        }
        assert!("producer".parse::<PersonRole>().is_err());
    }

    #[test]
    fn test_table_order_puts_join_tables_last() {
        let fw = TABLE_ORDER.iter().position(|t| *t == "film_work").unwrap();
        let gfw = TABLE_ORDER
            .iter()
            .position(|t| *t == "genre_film_work")
            .unwrap();
        let pfw = TABLE_ORDER
            .iter()
            .position(|t| *t == "person_film_work")
            .unwrap();
        assert!(fw < gfw);
        assert!(fw < pfw);
    }

    #[test]
    fn test_genre_from_sqlite_row() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE genre (id TEXT, created_at TEXT, updated_at TEXT, name TEXT, description TEXT);
             INSERT INTO genre VALUES (
                 'ca124c76-9760-4406-bfa0-409b1e38d200',
                 '2021-06-16 20:14:09.221838+00',
                 '2021-06-16 20:14:09.221855+00',
                 'Comedy',
                 NULL
             );",
        )
        .unwrap();

        let mut stmt = conn.prepare("SELECT * FROM genre").unwrap();
        let genre = stmt
            .query_row([], |row| {
                Ok(Genre::from_sqlite_row(row))
            })
            .unwrap()
            .unwrap();

        assert_eq!(
            genre.id,
            "ca124c76-9760-4406-bfa0-409b1e38d200".parse::<Uuid>().unwrap()
        );
        assert_eq!(genre.name, "Comedy");
        assert_eq!(genre.description, None);
        assert_eq!(genre.created_at.timezone().utc_minus_local(), 0);
    }

    #[test]
    fn test_person_missing_full_name_is_conversion_error() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        // Table lacks the required full_name column entirely.
        conn.execute_batch(
            "CREATE TABLE person (id TEXT, created_at TEXT, updated_at TEXT);
             INSERT INTO person VALUES (
                 '5dd77305-4caa-4b52-b673-8e5b922d46f9',
                 '2021-06-16 20:14:09.221838+00',
                 '2021-06-16 20:14:09.221855+00'
             );",
        )
        .unwrap();

        let mut stmt = conn.prepare("SELECT * FROM person").unwrap();
        let result = stmt
            .query_row([], |row| Ok(Person::from_sqlite_row(row)))
            .unwrap();

        match result {
            Err(MigrateError::Conversion { table, reason }) => {
                assert_eq!(table, "person");
                assert!(reason.contains("full_name"));
            }
            other => panic!("expected Conversion error, got {other:?}"),
        }
    }

    #[test]
    fn test_film_work_rejects_unknown_type() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE film_work (id TEXT, created_at TEXT, updated_at TEXT, title TEXT,
                 description TEXT, creation_date TEXT, file_path TEXT, rating REAL, type TEXT);
             INSERT INTO film_work VALUES (
                 '3d825f60-9fff-4dfe-b294-1a45fa1e115d',
                 '2021-06-16 20:14:09.221838+00',
                 '2021-06-16 20:14:09.221855+00',
                 'Star Wars', NULL, '1977-05-25', NULL, 8.6, 'hologram'
             );",
        )
        .unwrap();

        let mut stmt = conn.prepare("SELECT * FROM film_work").unwrap();
        let result = stmt
            .query_row([], |row| Ok(FilmWork::from_sqlite_row(row)))
            .unwrap();

        match result {
            Err(MigrateError::Conversion { table, reason }) => {
                assert_eq!(table, "film_work");
                assert!(reason.contains("hologram"));
            }
            other => panic!("expected Conversion error, got {other:?}"),
        }
    }

    #[test]
    fn test_film_work_parses_nullable_fields() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE film_work (id TEXT, created_at TEXT, updated_at TEXT, title TEXT,
                 description TEXT, creation_date TEXT, file_path TEXT, rating REAL, type TEXT);
             INSERT INTO film_work VALUES (
                 '3d825f60-9fff-4dfe-b294-1a45fa1e115d',
                 '2021-06-16 20:14:09.221838+00',
                 '2021-06-16 20:14:09.221855+00',
                 'Star Wars', 'A space opera.', '1977-05-25', NULL, 8.6, 'movie'
             );",
        )
        .unwrap();

        let mut stmt = conn.prepare("SELECT * FROM film_work").unwrap();
        let film = stmt
            .query_row([], |row| Ok(FilmWork::from_sqlite_row(row)))
            .unwrap()
            .unwrap();

        assert_eq!(film.kind, FilmWorkKind::Movie);
        assert_eq!(film.creation_date, Some("1977-05-25".parse().unwrap()));
        assert_eq!(film.file_path, None);
        assert_eq!(film.rating, Some(8.6));
        assert_eq!(film.params().len(), FilmWork::COLUMNS.len());
    }
}
