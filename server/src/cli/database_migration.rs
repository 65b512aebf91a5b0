//! Checking and applying the database schema migrations, which are embedded into the binary.
use crate::cli_error::CliError;
use crate::setup::ServerConfig;
use diesel::migration::Migration;
use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::info;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgresql");

fn connect() -> Result<PgConnection, CliError> {
    Ok(PgConnection::establish(&ServerConfig::database_url_from_env()?)?)
}

/// Migrate the database schema to the latest migration known to this application version.
/// Progress information is printed to stdout.
pub fn run_migrations() -> Result<(), CliError> {
    let mut connection = connect()?;
    let mut harness = diesel_migrations::HarnessWithOutput::new(&mut connection, std::io::stdout());
    let applied = harness
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| CliError::DatabaseMigrationError(e.to_string()))?;
    info!("Applied {} database migrations.", applied.len());
    Ok(())
}

/// Check that all known migrations have been applied to the database.
///
/// Fails with [CliError::DatabaseMigrationRequired], listing the pending migrations, otherwise.
pub fn check_migration_state() -> Result<(), CliError> {
    let mut connection = connect()?;
    let pending = connection
        .pending_migrations(MIGRATIONS)
        .map_err(|e| CliError::DatabaseMigrationError(e.to_string()))?;
    if !pending.is_empty() {
        return Err(CliError::DatabaseMigrationRequired {
            missing_migrations: pending.iter().map(|m| m.name().to_string()).collect(),
        });
    }
    Ok(())
}
