//! Aggregation of a line item collection into a [`Summary`].
//!
//! | Total | Value |
//! |-------|-------|
//! | `totalSum`           | Σ `sum` |
//! | `timerTotalt`        | Σ `timer × antall` |
//! | material cost        | Σ `kostMateriell × antall` (not exposed) |
//! | `totalKostprisTimer` | Σ `timer × kostpris × antall` |
//! | `fortjeneste`        | `totalSum` − material cost − `totalKostprisTimer` |
//! | `bidrag`             | `fortjeneste / totalSum × 100`, or 0 when `totalSum ≤ 0` |
//!
//! Sums are accumulated exactly and each exposed figure is rounded once, to
//! two decimals. `fortjeneste` subtracts the unrounded cost totals; `bidrag`
//! is derived from the rounded `fortjeneste` and `totalSum`, so it can be
//! reproduced from the summary alone.
//!
//! Like the row formula, accumulation saturates at the [`Decimal`] limits.
//! When `fortjeneste / totalSum × 100` cannot be represented, `bidrag` takes
//! the limit with the sign of `fortjeneste`.

use rust_decimal::Decimal;

use crate::calculations::common::round_half_up;
use crate::models::{LineItem, Summary};

#[derive(Default)]
struct Totals {
    sum: Decimal,
    hours: Decimal,
    material_cost: Decimal,
    labor_cost: Decimal,
}

impl Totals {
    fn add(
        mut self,
        entry: &LineItem,
    ) -> Self {
        self.sum = self.sum.saturating_add(entry.sum);
        self.hours = self.hours.saturating_add(entry.timer.saturating_mul(entry.antall));
        self.material_cost = self
            .material_cost
            .saturating_add(entry.kost_materiell.saturating_mul(entry.antall));
        self.labor_cost = self.labor_cost.saturating_add(
            entry
                .timer
                .saturating_mul(entry.kostpris)
                .saturating_mul(entry.antall),
        );
        self
    }
}

/// Reduces already-calculated entries into portfolio totals.
///
/// Reads the stored `sum` of each entry, so the entries should have been
/// through [`calculate_row`](super::calculate_row). The input is not
/// modified and iteration order does not matter.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use quote_core::{LineItem, Summary, calculate_summary};
///
/// let entries: Vec<LineItem> = Vec::new();
/// let summary = calculate_summary(&entries);
///
/// assert_eq!(summary, Summary::default());
/// assert_eq!(summary.bidrag, dec!(0));
/// ```
pub fn calculate_summary<'a, I>(entries: I) -> Summary
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let totals = entries.into_iter().fold(Totals::default(), Totals::add);

    let total_sum = round_half_up(totals.sum);
    let fortjeneste = round_half_up(
        totals
            .sum
            .saturating_sub(totals.material_cost)
            .saturating_sub(totals.labor_cost),
    );

    let bidrag = if total_sum > Decimal::ZERO {
        round_half_up(margin_percent(fortjeneste, total_sum))
    } else {
        Decimal::ZERO
    };

    Summary {
        total_sum,
        fortjeneste,
        timer_totalt: round_half_up(totals.hours),
        bidrag,
        total_kostpris_timer: round_half_up(totals.labor_cost),
    }
}

/// `profit / total × 100` for a positive `total`.
fn margin_percent(
    profit: Decimal,
    total: Decimal,
) -> Decimal {
    profit
        .checked_div(total)
        .map(|share| share.saturating_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(if profit.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::calculations::calculate_row;
    use crate::models::{DefaultSettings, EntryId};

    fn entry(
        id: &str,
        antall: Decimal,
        kost_materiell: Decimal,
        timer: Decimal,
        kostpris: Decimal,
        timepris: Decimal,
        paslag_materiell: Decimal,
    ) -> LineItem {
        calculate_row(LineItem {
            antall,
            kost_materiell,
            timer,
            kostpris,
            timepris,
            paslag_materiell,
            ..LineItem::new(EntryId::new(id), &DefaultSettings::default())
        })
    }

    fn sample_entries() -> Vec<LineItem> {
        vec![
            entry("a", dec!(1), dec!(1000), dec!(1), dec!(700), dec!(995), dec!(20)),
            entry("b", dec!(3), dec!(500), dec!(2), dec!(700), dec!(700), dec!(10)),
            entry("c", dec!(1), dec!(0), dec!(0), dec!(700), dec!(995), dec!(20)),
        ]
    }

    #[test]
    fn empty_collection_is_all_zero() {
        let entries: Vec<LineItem> = Vec::new();

        let summary = calculate_summary(&entries);

        assert_eq!(
            summary,
            Summary {
                total_sum: dec!(0),
                fortjeneste: dec!(0),
                timer_totalt: dec!(0),
                bidrag: dec!(0),
                total_kostpris_timer: dec!(0),
            }
        );
    }

    #[test]
    fn total_sum_adds_line_totals() {
        let summary = calculate_summary(&sample_entries());

        assert_eq!(summary.total_sum, dec!(8045.00));
    }

    #[test]
    fn hours_are_weighted_by_quantity() {
        let summary = calculate_summary(&sample_entries());

        // 1*1 + 2*3 + 0*1
        assert_eq!(summary.timer_totalt, dec!(7.00));
    }

    #[test]
    fn labor_cost_basis_uses_kostpris() {
        let summary = calculate_summary(&sample_entries());

        // 1*700*1 + 2*700*3
        assert_eq!(summary.total_kostpris_timer, dec!(4900.00));
    }

    #[test]
    fn profit_subtracts_material_and_labor_cost() {
        let summary = calculate_summary(&sample_entries());

        // 8045 - (1000*1 + 500*3) - 4900
        assert_eq!(summary.fortjeneste, dec!(645.00));
    }

    #[test]
    fn margin_is_profit_share_of_total() {
        let summary = calculate_summary(&sample_entries());

        // 645 / 8045 * 100 = 8.01740...
        assert_eq!(summary.bidrag, dec!(8.02));
    }

    #[test]
    fn margin_is_zero_when_total_is_zero() {
        let entries = vec![entry("a", dec!(2), dec!(0), dec!(1), dec!(700), dec!(0), dec!(0))];

        let summary = calculate_summary(&entries);

        assert_eq!(summary.total_sum, dec!(0));
        assert_eq!(summary.fortjeneste, dec!(-1400.00));
        assert_eq!(summary.bidrag, dec!(0));
    }

    #[test]
    fn margin_is_zero_when_total_is_negative() {
        let entries = vec![entry("a", dec!(-1), dec!(100), dec!(0), dec!(0), dec!(0), dec!(0))];

        let summary = calculate_summary(&entries);

        assert_eq!(summary.total_sum, dec!(-100.00));
        assert_eq!(summary.bidrag, dec!(0));
    }

    #[test]
    fn order_does_not_matter() {
        let entries = sample_entries();
        let reversed: Vec<LineItem> = entries.iter().rev().cloned().collect();

        assert_eq!(calculate_summary(&entries), calculate_summary(&reversed));
    }

    #[test]
    fn total_rounds_once_over_exact_sum() {
        // Each line total is already rounded; three of 0.01 add to 0.03 exactly.
        let entries: Vec<LineItem> = ["a", "b", "c"]
            .into_iter()
            .map(|id| entry(id, dec!(1), dec!(0.01), dec!(0), dec!(0), dec!(0), dec!(0)))
            .collect();

        assert_eq!(calculate_summary(&entries).total_sum, dec!(0.03));
    }

    #[test]
    fn huge_entries_saturate_instead_of_overflowing() {
        let big = dec!(1000000000000000);
        let entries = vec![
            entry("a", big, big, big, big, big, dec!(0)),
            entry("b", big, big, dec!(0), dec!(0), dec!(0), dec!(0)),
        ];

        let summary = calculate_summary(&entries);

        assert_eq!(summary.total_sum, Decimal::MAX);
        assert_eq!(summary.timer_totalt, Decimal::MAX);
        assert_eq!(summary.total_kostpris_timer, Decimal::MAX);
        // MAX - MAX - MAX
        assert_eq!(summary.fortjeneste, Decimal::MIN);
        assert_eq!(summary.bidrag, dec!(-100.00));
    }

    #[test]
    fn margin_saturates_when_the_ratio_is_unrepresentable() {
        assert_eq!(margin_percent(Decimal::MAX, dec!(0.01)), Decimal::MAX);
        assert_eq!(margin_percent(Decimal::MIN, dec!(0.01)), Decimal::MIN);
        assert_eq!(margin_percent(dec!(50), dec!(200)), dec!(25));
    }

    #[test]
    fn full_margin_when_there_are_no_costs() {
        let entries = vec![entry("a", dec!(2), dec!(0), dec!(1.5), dec!(0), dec!(800), dec!(0))];

        let summary = calculate_summary(&entries);

        assert_eq!(summary.total_sum, dec!(2400.00));
        assert_eq!(summary.fortjeneste, dec!(2400.00));
        assert_eq!(summary.bidrag, dec!(100.00));
    }
}
