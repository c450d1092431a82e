mod calculator;
mod default_settings;
mod field;
mod line_item;
mod summary;

pub use calculator::{Calculator, CalculatorSnapshot, NewCalculator};
pub use default_settings::DefaultSettings;
pub use field::{EntryField, FieldUpdate, FieldValueError, MAX_INPUT_MAGNITUDE, check_input_range};
pub use line_item::{EntryId, LineItem};
pub use summary::Summary;
