//! # sqlite-pg-migrate
//!
//! Batched, verified migration of the movies database from SQLite to
//! PostgreSQL.
//!
//! The library moves five fixed tables (genre, person, film_work,
//! genre_film_work, person_film_work) in dependency order, with:
//!
//! - **Paged reads** (`LIMIT`/`OFFSET`) so peak memory stays at one page
//! - **Conflict-skip inserts** (`ON CONFLICT (id) DO NOTHING`) for
//!   idempotent re-runs
//! - **Post-transfer verification** of row counts and full row contents
//! - **A single target transaction** spanning transfer and verify, so a
//!   failed run leaves the target unchanged
//!
//! ## Example
//!
//! ```rust,no_run
//! use sqlite_pg_migrate::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.yaml")?;
//!     let mut orchestrator = Orchestrator::new(config).await?;
//!     let result = orchestrator.run().await?;
//!     println!("Migrated {} rows", result.rows_transferred);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod source;
pub mod target;
pub mod verify;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use model::{FilmWork, FilmWorkKind, Genre, GenreFilmWork, Person, PersonFilmWork, PersonRole, Record};
pub use orchestrator::{CountReport, MigrationResult, Orchestrator, TableReport};
pub use source::SqliteSource;
pub use target::PgTarget;
pub use verify::Verifier;
