use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use super::LineItem;

/// Errors raised while turning raw user input into a [`FieldUpdate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldValueError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// `enhetspris` and `sum` are calculated and cannot be edited.
    #[error("field '{0}' is calculated and cannot be edited")]
    ReadOnlyField(&'static str),

    #[error("invalid number '{value}' for field '{field}'")]
    InvalidNumber { field: &'static str, value: String },

    /// The value is larger than [`MAX_INPUT_MAGNITUDE`] either way.
    #[error("value '{value}' for field '{field}' is out of range")]
    OutOfRange { field: &'static str, value: String },
}

/// Largest accepted absolute value of a numeric input field (one billion).
///
/// Keeps every product in the row and summary formulas well inside what
/// [`Decimal`] can hold.
pub const MAX_INPUT_MAGNITUDE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// The user-editable fields of a line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryField {
    Post,
    Beskrivelse,
    Antall,
    KostMateriell,
    Timer,
    Kostpris,
    Timepris,
    PaslagMateriell,
    Kommentar,
}

impl EntryField {
    pub const ALL: [EntryField; 9] = [
        Self::Post,
        Self::Beskrivelse,
        Self::Antall,
        Self::KostMateriell,
        Self::Timer,
        Self::Kostpris,
        Self::Timepris,
        Self::PaslagMateriell,
        Self::Kommentar,
    ];

    /// Interchange name of the field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Beskrivelse => "beskrivelse",
            Self::Antall => "antall",
            Self::KostMateriell => "kostMateriell",
            Self::Timer => "timer",
            Self::Kostpris => "kostpris",
            Self::Timepris => "timepris",
            Self::PaslagMateriell => "paslagMateriell",
            Self::Kommentar => "kommentar",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Post | Self::Beskrivelse | Self::Kommentar)
    }
}

impl FromStr for EntryField {
    type Err = FieldValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enhetspris" => Err(FieldValueError::ReadOnlyField("enhetspris")),
            "sum" => Err(FieldValueError::ReadOnlyField("sum")),
            _ => Self::ALL
                .into_iter()
                .find(|field| field.as_str() == s)
                .ok_or_else(|| FieldValueError::UnknownField(s.to_string())),
        }
    }
}

/// A single input-field edit, carrying the already-typed new value.
///
/// Derived fields have no variant; only the row calculation writes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Post(String),
    Beskrivelse(String),
    Antall(Decimal),
    KostMateriell(Decimal),
    Timer(Decimal),
    Kostpris(Decimal),
    Timepris(Decimal),
    PaslagMateriell(Decimal),
    Kommentar(String),
}

impl FieldUpdate {
    /// Builds an update from raw text as typed by a user.
    ///
    /// Numeric fields accept `,` as decimal separator and ignore whitespace
    /// (`"1 250,5"` is 1250.5). Blank numeric input means zero.
    ///
    /// # Example
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use quote_core::{EntryField, FieldUpdate};
    ///
    /// let update = FieldUpdate::parse(EntryField::Timer, "2,5").unwrap();
    /// assert_eq!(update, FieldUpdate::Timer(dec!(2.5)));
    /// ```
    pub fn parse(
        field: EntryField,
        raw: &str,
    ) -> Result<Self, FieldValueError> {
        let number = || parse_number(field, raw);

        Ok(match field {
            EntryField::Post => Self::Post(raw.to_string()),
            EntryField::Beskrivelse => Self::Beskrivelse(raw.to_string()),
            EntryField::Kommentar => Self::Kommentar(raw.to_string()),
            EntryField::Antall => Self::Antall(number()?),
            EntryField::KostMateriell => Self::KostMateriell(number()?),
            EntryField::Timer => Self::Timer(number()?),
            EntryField::Kostpris => Self::Kostpris(number()?),
            EntryField::Timepris => Self::Timepris(number()?),
            EntryField::PaslagMateriell => Self::PaslagMateriell(number()?),
        })
    }

    pub fn field(&self) -> EntryField {
        match self {
            Self::Post(_) => EntryField::Post,
            Self::Beskrivelse(_) => EntryField::Beskrivelse,
            Self::Antall(_) => EntryField::Antall,
            Self::KostMateriell(_) => EntryField::KostMateriell,
            Self::Timer(_) => EntryField::Timer,
            Self::Kostpris(_) => EntryField::Kostpris,
            Self::Timepris(_) => EntryField::Timepris,
            Self::PaslagMateriell(_) => EntryField::PaslagMateriell,
            Self::Kommentar(_) => EntryField::Kommentar,
        }
    }

    /// Overwrites the matching input field. Derived fields are left alone;
    /// the caller recalculates the row.
    pub fn apply_to(
        self,
        entry: &mut LineItem,
    ) {
        match self {
            Self::Post(value) => entry.post = value,
            Self::Beskrivelse(value) => entry.beskrivelse = value,
            Self::Antall(value) => entry.antall = value,
            Self::KostMateriell(value) => entry.kost_materiell = value,
            Self::Timer(value) => entry.timer = value,
            Self::Kostpris(value) => entry.kostpris = value,
            Self::Timepris(value) => entry.timepris = value,
            Self::PaslagMateriell(value) => entry.paslag_materiell = value,
            Self::Kommentar(value) => entry.kommentar = value,
        }
    }
}

/// Checks that every numeric input of `entry` is within
/// [`MAX_INPUT_MAGNITUDE`].
///
/// Text input goes through [`FieldUpdate::parse`], which already applies the
/// bound; this covers entries that arrive fully typed, such as JSON imports.
pub fn check_input_range(entry: &LineItem) -> Result<(), FieldValueError> {
    let numeric = [
        (EntryField::Antall, entry.antall),
        (EntryField::KostMateriell, entry.kost_materiell),
        (EntryField::Timer, entry.timer),
        (EntryField::Kostpris, entry.kostpris),
        (EntryField::Timepris, entry.timepris),
        (EntryField::PaslagMateriell, entry.paslag_materiell),
    ];

    for (field, value) in numeric {
        check_magnitude(field, value, || value.to_string())?;
    }
    Ok(())
}

fn check_magnitude(
    field: EntryField,
    value: Decimal,
    raw: impl FnOnce() -> String,
) -> Result<Decimal, FieldValueError> {
    if value.abs() > MAX_INPUT_MAGNITUDE {
        return Err(FieldValueError::OutOfRange {
            field: field.as_str(),
            value: raw(),
        });
    }
    Ok(value)
}

fn parse_number(
    field: EntryField,
    raw: &str,
) -> Result<Decimal, FieldValueError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    if cleaned.is_empty() {
        return Ok(Decimal::ZERO);
    }

    let value = cleaned
        .parse::<Decimal>()
        .map_err(|_| FieldValueError::InvalidNumber {
            field: field.as_str(),
            value: raw.to_string(),
        })?;
    check_magnitude(field, value, || raw.to_string())
}
