//! SQLite storage for calculators.
//!
//! [`SqliteRepository`] implements [`quote_core::CalculatorRepository`] on top
//! of `sqlx`. [`SqliteRepositoryFactory`] plugs it into a
//! [`quote_core::db::RepositoryRegistry`] under the `"sqlite"` backend name.

mod decimal;
mod factory;
mod repository;

pub use factory::{SqliteRepositoryFactory, connection_url};
pub use repository::SqliteRepository;
