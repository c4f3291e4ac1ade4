//! Column type detection

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tabsynth_common::{is_missing, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Datetime,
    Categorical,
}

impl ColumnType {
    /// Integer and floating point columns take part in pair statistics.
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub column_type: ColumnType,
}

/// Column names and detected types, in table order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_type(&self, index: usize) -> Option<ColumnType> {
        self.columns.get(index).map(|c| c.column_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

pub trait MetadataDetector: Send + Sync {
    fn detect(&self, table: &Table) -> TableMetadata;
}

/// Types each column by the narrowest type every present cell parses as.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicDetector;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

fn is_boolean(cell: &str) -> bool {
    matches!(
        cell.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no"
    )
}

fn is_datetime(cell: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|f| NaiveDate::parse_from_str(cell, f).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(cell, f).is_ok())
}

fn classify<'a>(cells: impl Iterator<Item = &'a str>) -> ColumnType {
    let present: Vec<&str> = cells.filter(|c| !is_missing(c)).map(str::trim).collect();
    if present.is_empty() {
        return ColumnType::Categorical;
    }

    if present.iter().all(|c| c.parse::<i64>().is_ok()) {
        ColumnType::Integer
    } else if present.iter().all(|c| c.parse::<f64>().is_ok()) {
        ColumnType::Float
    } else if present.iter().all(|c| is_boolean(c)) {
        ColumnType::Boolean
    } else if present.iter().all(|c| is_datetime(c)) {
        ColumnType::Datetime
    } else {
        ColumnType::Categorical
    }
}

impl MetadataDetector for HeuristicDetector {
    fn detect(&self, table: &Table) -> TableMetadata {
        let columns = table
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, name)| ColumnMetadata {
                name: name.clone(),
                column_type: classify(table.column_values(idx)),
            })
            .collect();
        TableMetadata { columns }
    }
}
