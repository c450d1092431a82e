use std::path::PathBuf;

use async_trait::async_trait;
use quote_core::db::{CalculatorRepository, DbConfig, RepositoryError, RepositoryFactory};
use tracing::debug;

use crate::repository::SqliteRepository;

/// Resolve the seeds directory at runtime so it works in both development and
/// packaged distribution.
///
/// Resolution order:
/// 1. `QUOTE_DB_SQLITE_SEEDS_DIR`, if set.
/// 2. `./seeds`, if that directory exists in the current working directory.
/// 3. `$CARGO_MANIFEST_DIR/seeds` as a last resort.
fn seeds_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("QUOTE_DB_SQLITE_SEEDS_DIR") {
        return PathBuf::from(dir);
    }
    let cwd_seeds = PathBuf::from("./seeds");
    if cwd_seeds.is_dir() {
        return cwd_seeds;
    }
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds")
}

/// Turns a configured connection string into a `sqlx` SQLite URL.
///
/// * `":memory:"` (or an empty string) opens an in-memory database.
/// * Anything already starting with `sqlite:` is passed through.
/// * Any other value is a file path; the file is created if missing.
pub fn connection_url(connection_string: &str) -> String {
    let trimmed = connection_string.trim();
    if trimmed.is_empty() || trimmed == ":memory:" {
        "sqlite::memory:".to_string()
    } else if trimmed.starts_with("sqlite:") {
        trimmed.to_string()
    } else {
        format!("sqlite:{trimmed}?mode=rwc")
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`quote_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use quote_core::db::RepositoryRegistry;
/// use quote_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens the database, runs migrations and applies the seed files.
    ///
    /// Seeds only insert rows that are missing, so reopening an existing
    /// database keeps its saved default settings.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn CalculatorRepository>, RepositoryError> {
        let url = connection_url(&config.connection_string);
        debug!(url = %url, "Connecting to SQLite");

        let repo = SqliteRepository::new(&url)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{e:#}")))?;
        repo.run_migrations()
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        repo.run_seeds(&seeds_dir())
            .await
            .map_err(|e| RepositoryError::Database(format!("{e:#}")))?;
        Ok(Box::new(repo))
    }
}
