use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Organization-level defaults applied to newly added line items.
///
/// Passed explicitly into entry creation. Changing the defaults never touches
/// existing entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultSettings {
    /// Labor cost rate per hour.
    pub kostpris: Decimal,
    /// Labor sell rate per hour.
    pub timepris: Decimal,
    /// Material markup in percent.
    pub paslag_materiell: Decimal,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            kostpris: Decimal::new(700, 0),
            timepris: Decimal::new(995, 0),
            paslag_materiell: Decimal::new(20, 0),
        }
    }
}
