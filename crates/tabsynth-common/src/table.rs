//! In-memory tabular data
//!
//! A [`Table`] is a header row plus string cells. Typing happens later, in the
//! engine's metadata detector; this module only knows how to read and write
//! comma-separated files and how to recognise a missing cell.

use crate::error::{Result, TabSynthError};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

/// Cell spellings treated as missing values.
const MISSING_MARKERS: &[&str] = &[
    "", "NA", "N/A", "NaN", "nan", "null", "NULL", "None", "<NA>", "#N/A",
];

/// Returns true when a cell carries no value.
pub fn is_missing(cell: &str) -> bool {
    let trimmed = cell.trim();
    MISSING_MARKERS.contains(&trimmed)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TabSynthError::RaggedRow {
                    row: idx + 1,
                    expected: columns.len(),
                    actual: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Read a comma-separated table whose first record is the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        if headers.is_empty() {
            return Err(TabSynthError::EmptyTable);
        }
        let columns: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            // Trailing blank lines come through as a single empty field
            if record.len() == 1 && record.get(0).is_some_and(str::is_empty) && columns.len() > 1 {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(columns, rows)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn write_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(std::io::BufWriter::new(file))
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, in row order.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Parse one column as floating point; missing or unparsable cells become `None`.
    pub fn numeric_values(&self, index: usize) -> Vec<Option<f64>> {
        self.column_values(index)
            .map(|cell| {
                if is_missing(cell) {
                    None
                } else {
                    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
                }
            })
            .collect()
    }

    pub fn numeric_column(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let index = self
            .column_index(name)
            .ok_or_else(|| TabSynthError::UnknownColumn(name.to_string()))?;
        Ok(self.numeric_values(index))
    }

    /// First `n` rows as a new table.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = "a,b,c\n1,x,2.5\n2,,NaN\n3,z,4.0\n";

    #[test]
    fn test_read_table() {
        let table = Table::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.columns(), &["a", "b", "c"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.width(), 3);
        assert_eq!(table.column_index("c"), Some(2));
        assert_eq!(table.column_index("missing"), None);
    }

    #[test]
    fn test_numeric_values_treat_markers_as_missing() {
        let table = Table::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.numeric_values(2), vec![Some(2.5), None, Some(4.0)]);
        assert_eq!(
            table.numeric_column("a").unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
        assert!(table.numeric_column("nope").is_err());
    }

    #[test]
    fn test_missing_markers() {
        for marker in ["", "  ", "NA", "NaN", "null", "None", "<NA>"] {
            assert!(is_missing(marker), "{marker:?} should be missing");
        }
        assert!(!is_missing("0"));
        assert!(!is_missing("nope"));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Table::from_reader("a,b\n1,2\n3\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            TabSynthError::RaggedRow {
                row: 2,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_write_and_head() {
        let table = Table::from_reader(SAMPLE.as_bytes()).unwrap();
        let head = table.head(1);
        assert_eq!(head.len(), 1);

        let bytes = head.to_csv_bytes().unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "a,b,c\n1,x,2.5\n");
    }

    #[test]
    fn test_write_path_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        let table = Table::from_reader(SAMPLE.as_bytes()).unwrap();
        table.write_path(&path).unwrap();
        assert_eq!(Table::from_path(&path).unwrap(), table);
    }
}
