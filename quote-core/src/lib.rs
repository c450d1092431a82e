//! Pricing engine for itemized quotes.
//!
//! A quote is an ordered list of [`LineItem`]s. Each row's unit price and
//! line total are derived from its material and labor inputs by
//! [`calculate_row`]; the whole list is reduced into a [`Summary`] by
//! [`calculate_summary`]. [`EntryCollection`] is the only way rows change,
//! and [`CalculatorSession`] ties a collection to its summary, its defaults
//! and its save state.

pub mod calculations;
pub mod collection;
pub mod db;
pub mod identity;
pub mod models;
pub mod session;

pub use calculations::{calculate_row, calculate_summary};
pub use collection::{Change, EntryCollection};
pub use db::{CalculatorRepository, RepositoryError};
pub use identity::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use models::*;
pub use session::{CalculatorSession, SaveState};
