use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Calculator, CalculatorSnapshot, DefaultSettings, NewCalculator};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Storage boundary for calculators.
///
/// The core hands implementations a finished [`CalculatorSnapshot`] and gets
/// the same shape back on load. How entries are laid out in storage is up to
/// the backend, as long as entry order and the interchange field values
/// survive a round trip.
#[async_trait]
pub trait CalculatorRepository: Send + Sync {
    // Default settings
    async fn get_default_settings(&self) -> Result<DefaultSettings, RepositoryError>;

    async fn save_default_settings(
        &self,
        settings: &DefaultSettings,
    ) -> Result<(), RepositoryError>;

    // Calculators
    async fn create_calculator(
        &self,
        calculator: NewCalculator,
    ) -> Result<Calculator, RepositoryError>;

    async fn get_calculator(&self, id: i64) -> Result<Calculator, RepositoryError>;

    /// Every calculator, most recently updated first.
    async fn list_calculators(&self) -> Result<Vec<Calculator>, RepositoryError>;

    async fn rename_calculator(
        &self,
        id: i64,
        name: &str,
    ) -> Result<(), RepositoryError>;

    async fn delete_calculator(&self, id: i64) -> Result<(), RepositoryError>;

    // Entries
    /// Replaces the calculator's entries and summary with `snapshot`.
    async fn save_snapshot(
        &self,
        id: i64,
        snapshot: &CalculatorSnapshot,
    ) -> Result<(), RepositoryError>;
}
