//! Pricing calculations for quote line items.
//!
//! Two pure functions make up the engine:
//!
//! - [`calculate_row`] derives `enhetspris` and `sum` for one entry.
//! - [`calculate_summary`] reduces a whole collection into a [`Summary`].
//!
//! [`Summary`]: crate::models::Summary

pub mod common;
pub mod row;
pub mod summary;

pub use row::{PriceBreakdown, calculate_row, price_breakdown};
pub use summary::calculate_summary;
