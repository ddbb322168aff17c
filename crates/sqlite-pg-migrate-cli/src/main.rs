//! sqlite-pg-migrate CLI - Batched, verified SQLite to PostgreSQL migration.

use clap::{Parser, Subcommand};
use sqlite_pg_migrate::{Config, MigrateError, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "sqlite-pg-migrate")]
#[command(about = "Batched, verified SQLite to PostgreSQL migration")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Read configuration from environment variables instead of a file
    /// (SQLITE_DB_NAME, DB_NAME, DB_USER, DB_PASSWORD, DB_HOST, DB_PORT)
    #[arg(long)]
    from_env: bool,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transfer all tables and verify them, in one target transaction
    Run {
        /// Override rows per page/batch
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Compare per-table row counts between source and target
    Validate,

    /// Verify committed target contents against the source, without writing
    Verify,

    /// Test database connections and source table presence
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = if cli.from_env {
        let config = Config::from_env()?;
        info!("Loaded configuration from environment");
        config
    } else {
        let config = Config::load(&cli.config)?;
        info!("Loaded configuration from {:?}", cli.config);
        config
    };

    match cli.command {
        Commands::Run { batch_size } => {
            if let Some(size) = batch_size {
                config.migration.batch_size = size;
            }

            let mut orchestrator = Orchestrator::new(config).await?;
            let result = orchestrator.run().await?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                println!("\nMigration completed!");
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Rows: {}", result.rows_transferred);
                for table in &result.tables {
                    println!(
                        "    {}: {} rows in {} pages",
                        table.table, table.rows, table.pages
                    );
                }
            }
        }

        Commands::Validate => {
            let orchestrator = Orchestrator::new(config).await?;
            let reports = orchestrator.validate().await?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    let status = if report.matches() { "ok" } else { "MISMATCH" };
                    println!(
                        "  {}: source {} / target {} [{}]",
                        report.table, report.source_rows, report.target_rows, status
                    );
                }
            }

            if let Some(report) = reports.iter().find(|r| !r.matches()) {
                return Err(MigrateError::verification(
                    report.table.clone(),
                    format!(
                        "row count mismatch: source has {}, target has {}",
                        report.source_rows, report.target_rows
                    ),
                ));
            }
            println!("Validation completed successfully");
        }

        Commands::Verify => {
            let orchestrator = Orchestrator::new(config).await?;
            orchestrator.verify().await?;
            println!("Verification completed successfully");
        }

        Commands::HealthCheck => {
            let orchestrator = Orchestrator::new(config).await?;
            orchestrator.health_check().await?;
            println!("Both databases are reachable");
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
