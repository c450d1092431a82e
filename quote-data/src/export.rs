//! CSV and JSON renderers for saved calculators.
//!
//! Both read a finished [`CalculatorSnapshot`] and never modify it.

use std::io::Write;

use quote_core::{CalculatorSnapshot, LineItem};

/// Writes one CSV row per entry, in order, with every interchange column
/// including the derived `enhetspris` and `sum`.
pub fn write_csv<W: Write>(
    writer: W,
    entries: &[LineItem],
) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for entry in entries {
        csv_writer.serialize(entry)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Pretty-printed JSON of the whole snapshot.
pub fn to_json(snapshot: &CalculatorSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(snapshot)
}
