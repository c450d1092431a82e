use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use quote_core::{
    CalculatorSnapshot, DefaultSettings, EntryField, FieldUpdate, FieldValueError, IdGenerator,
    LineItem, check_input_range,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when reading line items from a file.
#[derive(Debug, Error)]
pub enum EntryImportError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),

    #[error("Row {row}: {source}")]
    InvalidValue {
        /// 1-based CSV data row (not counting the header) or JSON entry.
        row: usize,
        #[source]
        source: FieldValueError,
    },

    #[error("Duplicate entry id '{0}'")]
    DuplicateId(String),

    #[error("Unsupported file type '{0}' (expected .csv or .json)")]
    UnsupportedFormat(String),
}

impl From<csv::Error> for EntryImportError {
    fn from(err: csv::Error) -> Self {
        EntryImportError::CsvParse(err.to_string())
    }
}

impl From<serde_json::Error> for EntryImportError {
    fn from(err: serde_json::Error) -> Self {
        EntryImportError::JsonParse(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Picks the format from the file extension, ignoring case.
    pub fn from_path(path: &Path) -> Result<Self, EntryImportError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(EntryImportError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Input columns start from zero; only quantity starts at one.
const BLANK_RATES: DefaultSettings = DefaultSettings {
    kostpris: Decimal::ZERO,
    timepris: Decimal::ZERO,
    paslag_materiell: Decimal::ZERO,
};

/// A JSON import is either a saved snapshot or a bare list of entries.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonDocument {
    Snapshot(CalculatorSnapshot),
    Entries(Vec<LineItem>),
}

/// Reader for line item files.
///
/// Imported rows carry whatever derived values the file had; the collection
/// they are loaded into recalculates them.
pub struct EntryImporter;

impl EntryImporter {
    /// Parse line items from CSV with a header row.
    ///
    /// Columns are matched by interchange name (`post`, `kostMateriell`, ...)
    /// in any order. `id`, `enhetspris`, `sum` and unrecognised columns are
    /// skipped. A blank `antall` means one; any other blank number means
    /// zero. Every row gets a fresh id from `ids`.
    pub fn parse_csv<R: Read>(
        reader: R,
        ids: &dyn IdGenerator,
    ) -> Result<Vec<LineItem>, EntryImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<Option<EntryField>> = csv_reader
            .headers()?
            .iter()
            .map(|header| match header.parse::<EntryField>() {
                Ok(field) => Some(field),
                Err(err) => {
                    debug!(column = header, reason = %err, "Skipping CSV column");
                    None
                }
            })
            .collect();

        let mut entries = Vec::new();

        for (index, result) in csv_reader.records().enumerate() {
            let record = result?;
            let row = index + 1;
            let mut entry = LineItem::new(ids.next_id(), &BLANK_RATES);

            for (field, raw) in columns.iter().zip(record.iter()) {
                let Some(field) = field else { continue };
                if *field == EntryField::Antall && raw.is_empty() {
                    continue;
                }
                FieldUpdate::parse(*field, raw)
                    .map_err(|source| EntryImportError::InvalidValue { row, source })?
                    .apply_to(&mut entry);
            }

            entries.push(entry);
        }

        info!(rows = entries.len(), "Parsed CSV entries");
        Ok(entries)
    }

    /// Parse line items from a JSON snapshot or entry array.
    ///
    /// Ids are kept as stored and must be unique. Numeric inputs must lie
    /// within [`MAX_INPUT_MAGNITUDE`](quote_core::MAX_INPUT_MAGNITUDE), like
    /// typed input. Any stored summary is discarded.
    pub fn parse_json<R: Read>(reader: R) -> Result<Vec<LineItem>, EntryImportError> {
        let entries = match serde_json::from_reader(reader)? {
            JsonDocument::Snapshot(snapshot) => snapshot.entries,
            JsonDocument::Entries(entries) => entries,
        };

        let mut seen = HashSet::new();
        for (index, entry) in entries.iter().enumerate() {
            if !seen.insert(&entry.id) {
                return Err(EntryImportError::DuplicateId(entry.id.to_string()));
            }
            check_input_range(entry)
                .map_err(|source| EntryImportError::InvalidValue { row: index + 1, source })?;
        }

        info!(rows = entries.len(), "Parsed JSON entries");
        Ok(entries)
    }

    /// Parse `reader` in the given format. CSV rows get ids from `ids`.
    pub fn parse<R: Read>(
        format: FileFormat,
        reader: R,
        ids: &dyn IdGenerator,
    ) -> Result<Vec<LineItem>, EntryImportError> {
        match format {
            FileFormat::Csv => Self::parse_csv(reader, ids),
            FileFormat::Json => Self::parse_json(reader),
        }
    }
}
