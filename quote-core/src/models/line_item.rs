use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::DefaultSettings;

/// Opaque, stable identity of a line item.
///
/// Assigned once when the entry is created and never reused. Update, delete
/// and duplicate operations locate entries by this value, never by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One row of a quote.
///
/// Field names serialize to the interchange vocabulary shared with
/// persistence and import/export (`kostMateriell`, `paslagMateriell`, ...).
///
/// `enhetspris` and `sum` are derived. They are stored on the entry, but only
/// [`calculate_row`](crate::calculations::calculate_row) writes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: EntryId,

    // Free text
    #[serde(default)]
    pub post: String,
    #[serde(default)]
    pub beskrivelse: String,

    // Inputs
    /// Quantity.
    pub antall: Decimal,
    /// Material cost per unit, before markup.
    pub kost_materiell: Decimal,
    /// Labor hours per unit.
    pub timer: Decimal,
    /// Labor cost rate per hour. Only feeds aggregate profit.
    pub kostpris: Decimal,
    /// Labor sell rate per hour.
    pub timepris: Decimal,
    /// Material markup in percent.
    pub paslag_materiell: Decimal,

    // Calculated values
    #[serde(default)]
    pub enhetspris: Decimal,
    #[serde(default)]
    pub sum: Decimal,

    #[serde(default)]
    pub kommentar: String,
}

impl LineItem {
    /// Creates an entry with the given identity and default inputs.
    ///
    /// Labor rates and markup come from `defaults`; quantity starts at one,
    /// hours and material at zero. Derived fields are zero, which is already
    /// consistent with these inputs.
    pub fn new(
        id: EntryId,
        defaults: &DefaultSettings,
    ) -> Self {
        Self {
            id,
            post: String::new(),
            beskrivelse: String::new(),
            antall: Decimal::ONE,
            kost_materiell: Decimal::ZERO,
            timer: Decimal::ZERO,
            kostpris: defaults.kostpris,
            timepris: defaults.timepris,
            paslag_materiell: defaults.paslag_materiell,
            enhetspris: Decimal::ZERO,
            sum: Decimal::ZERO,
            kommentar: String::new(),
        }
    }

    /// Whether every input field equals the other entry's, ignoring identity
    /// and derived fields.
    pub fn same_inputs(
        &self,
        other: &LineItem,
    ) -> bool {
        self.post == other.post
            && self.beskrivelse == other.beskrivelse
            && self.antall == other.antall
            && self.kost_materiell == other.kost_materiell
            && self.timer == other.timer
            && self.kostpris == other.kostpris
            && self.timepris == other.timepris
            && self.paslag_materiell == other.paslag_materiell
            && self.kommentar == other.kommentar
    }
}
