use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Totals over a line item collection at one point in time.
///
/// Has no identity of its own and is never updated piecemeal; it is rebuilt
/// from the full collection by
/// [`calculate_summary`](crate::calculations::calculate_summary).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Sum of every line total.
    pub total_sum: Decimal,

    /// Profit: total sum minus raw material cost minus labor cost basis.
    pub fortjeneste: Decimal,

    /// Total labor hours (hours per unit × quantity).
    pub timer_totalt: Decimal,

    /// Contribution margin in percent of the total sum.
    pub bidrag: Decimal,

    /// Labor cost basis (hours × cost rate × quantity).
    pub total_kostpris_timer: Decimal,
}
