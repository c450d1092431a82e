//! Per-row pricing.
//!
//! # Formula
//!
//! | Step | Value |
//! |------|-------|
//! | 1    | Material with markup: `kostMateriell × (1 + paslagMateriell / 100)` |
//! | 2    | Labor: `timer × timepris` |
//! | 3    | `enhetspris`: Step 1 + Step 2, rounded to 2 decimals |
//! | 4    | `sum`: rounded `enhetspris` × `antall`, rounded to 2 decimals |
//!
//! The line total is computed from the *rounded* unit price, never from the
//! unrounded intermediate. `kostpris` does not take part; the unit price is a
//! sell-side figure.
//!
//! Products saturate at [`Decimal::MAX`] / [`Decimal::MIN`] instead of
//! overflowing. Inputs parsed through [`FieldUpdate`](crate::FieldUpdate)
//! are bounded well below that, so saturation only shows up for entries built
//! directly in code.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use quote_core::{DefaultSettings, EntryId, LineItem, calculate_row};
//!
//! let entry = LineItem {
//!     antall: dec!(3),
//!     kost_materiell: dec!(500),
//!     timer: dec!(2),
//!     timepris: dec!(700),
//!     paslag_materiell: dec!(10),
//!     ..LineItem::new(EntryId::new("e-1"), &DefaultSettings::default())
//! };
//!
//! let row = calculate_row(entry);
//!
//! assert_eq!(row.enhetspris, dec!(1950.00));
//! assert_eq!(row.sum, dec!(5850.00));
//! ```

use rust_decimal::Decimal;
use tracing::warn;

use crate::calculations::common::round_half_up;
use crate::models::LineItem;

/// Intermediate values of a row calculation, kept for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    /// Material cost per unit including markup (unrounded).
    pub material_with_markup: Decimal,

    /// Labor price per unit (unrounded).
    pub labor: Decimal,

    /// Unit price, rounded.
    pub enhetspris: Decimal,

    /// Line total, rounded.
    pub sum: Decimal,
}

/// Computes every step of the row formula without touching the entry.
pub fn price_breakdown(entry: &LineItem) -> PriceBreakdown {
    let material_with_markup = material_with_markup(entry.kost_materiell, entry.paslag_materiell);
    let labor = entry.timer.saturating_mul(entry.timepris);
    let enhetspris = round_half_up(material_with_markup.saturating_add(labor));
    let sum = round_half_up(enhetspris.saturating_mul(entry.antall));

    PriceBreakdown {
        material_with_markup,
        labor,
        enhetspris,
        sum,
    }
}

/// Returns the entry with `enhetspris` and `sum` recomputed from its inputs.
///
/// Whatever derived values the entry arrives with are overwritten, so the
/// function is idempotent: `calculate_row(calculate_row(e)) == calculate_row(e)`.
pub fn calculate_row(mut entry: LineItem) -> LineItem {
    if entry.antall < Decimal::ZERO {
        warn!(
            entry_id = %entry.id,
            antall = %entry.antall,
            "Negative quantity; line total will be negative"
        );
    }

    let breakdown = price_breakdown(&entry);
    if breakdown.enhetspris < Decimal::ZERO {
        warn!(
            entry_id = %entry.id,
            paslag_materiell = %entry.paslag_materiell,
            enhetspris = %breakdown.enhetspris,
            "Negative unit price; check markup and rates"
        );
    }
    if is_saturated(breakdown.sum) {
        warn!(
            entry_id = %entry.id,
            sum = %breakdown.sum,
            "Line total hit the decimal limit"
        );
    }

    entry.enhetspris = breakdown.enhetspris;
    entry.sum = breakdown.sum;
    entry
}

fn material_with_markup(
    kost_materiell: Decimal,
    paslag_materiell: Decimal,
) -> Decimal {
    let factor = Decimal::ONE.saturating_add(paslag_materiell / Decimal::ONE_HUNDRED);
    kost_materiell.saturating_mul(factor)
}

fn is_saturated(value: Decimal) -> bool {
    value == Decimal::MAX || value == Decimal::MIN
}
