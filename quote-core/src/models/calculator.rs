use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LineItem, Summary};

/// The persisted shape of a quote: ordered entries plus their summary.
///
/// This is the only thing the persistence layer and the export renderers see.
/// They read it; they never change it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculatorSnapshot {
    pub entries: Vec<LineItem>,
    #[serde(default)]
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculator {
    pub id: i64,
    pub name: String,

    pub entries: Vec<LineItem>,
    pub summary: Summary,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Calculator {
    pub fn snapshot(&self) -> CalculatorSnapshot {
        CalculatorSnapshot {
            entries: self.entries.clone(),
            summary: self.summary,
        }
    }
}

/// For creating new calculators (no id, entries or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCalculator {
    pub name: String,
}
