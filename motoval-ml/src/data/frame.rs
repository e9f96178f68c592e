//! In-memory tabular frame with CSV load/save.

use crate::data::schema::{ColumnType, infer_column_type};
use crate::error::MlError;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Build a cell from a raw CSV field. Blank fields are missing.
    pub fn from_field(field: &str) -> Self {
        if field.trim().is_empty() {
            Self::Missing
        } else {
            Self::Text(field.to_string())
        }
    }

    /// Build a numeric cell, mapping `None` and non-finite values to missing.
    pub fn from_number(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::Number(v),
            _ => Self::Missing,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view of the cell. Text is parsed; unparsable or non-finite text yields `None`.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Self::Missing => None,
            Self::Number(v) => Some(*v).filter(|v| v.is_finite()),
            Self::Text(s) => parse_number(s),
        }
    }

    /// Textual view of the cell, as it would be written to CSV.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Missing => None,
            Self::Number(v) => Some(v.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }

    fn to_field(&self) -> String {
        self.to_text().unwrap_or_default()
    }
}

/// Parse a trimmed decimal number, rejecting NaN and infinities.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// A table of cells with named columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a frame, checking that every row matches the header width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, MlError> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(MlError::dataset(format!(
                "row {i} has {} cells, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Like [`Frame::column_index`], but a missing column is a dataset error.
    pub fn require_column(&self, name: &str) -> Result<usize, MlError> {
        self.column_index(name)
            .ok_or_else(|| MlError::dataset(format!("missing required column '{name}'")))
    }

    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Cell> + '_ {
        self.rows.iter().map(move |row| &row[index])
    }

    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        &self.rows[row][column]
    }

    /// Replace the values of an existing column.
    pub fn set_column(&mut self, index: usize, values: Vec<Cell>) -> Result<(), MlError> {
        if values.len() != self.rows.len() {
            return Err(MlError::dataset(format!(
                "column '{}' needs {} values, got {}",
                self.columns[index],
                self.rows.len(),
                values.len()
            )));
        }
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[index] = value;
        }
        Ok(())
    }

    /// Append a column, or overwrite it in place when the name already exists.
    pub fn upsert_column(&mut self, name: &str, values: Vec<Cell>) -> Result<(), MlError> {
        if let Some(index) = self.column_index(name) {
            return self.set_column(index, values);
        }
        if values.len() != self.rows.len() {
            return Err(MlError::dataset(format!(
                "column '{name}' needs {} values, got {}",
                self.rows.len(),
                values.len()
            )));
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Strip surrounding whitespace from every column name.
    pub fn trim_column_names(&mut self) {
        for column in &mut self.columns {
            let trimmed = column.trim();
            if trimmed.len() != column.len() {
                *column = trimmed.to_string();
            }
        }
    }

    /// Remove exact-duplicate rows, keeping the first occurrence. Returns the number removed.
    pub fn drop_duplicates(&mut self) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<Option<String>> = row.iter().map(Cell::to_text).collect();
            seen.insert(key)
        });
        before - self.rows.len()
    }

    pub fn retain_rows(&mut self, mut keep: impl FnMut(&[Cell]) -> bool) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| keep(row));
        before - self.rows.len()
    }

    /// Convert every numeric column's cells to [`Cell::Number`].
    ///
    /// Categorical columns are left as text.
    pub fn infer_types(&mut self) {
        for index in 0..self.columns.len() {
            if infer_column_type(self.column_values(index)) == ColumnType::Numeric {
                for row in &mut self.rows {
                    row[index] = Cell::from_number(row[index].to_number());
                }
            }
        }
    }

    /// Read a CSV with a header row. Every field is loaded as text.
    ///
    /// Short rows are padded with missing cells and long rows are truncated,
    /// so a ragged file still loads.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, MlError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if columns.is_empty() {
            return Err(MlError::dataset("CSV has no header row"));
        }

        let mut rows = Vec::new();
        let mut ragged = 0usize;
        for record in csv_reader.records() {
            let record = record?;
            if record.len() != columns.len() {
                ragged += 1;
            }
            let mut row: Vec<Cell> = record
                .iter()
                .take(columns.len())
                .map(Cell::from_field)
                .collect();
            row.resize(columns.len(), Cell::Missing);
            rows.push(row);
        }
        if ragged > 0 {
            tracing::warn!(rows = ragged, "CSV rows with unexpected field count were padded or truncated");
        }

        Ok(Self { columns, rows })
    }

    pub fn read_csv(path: &Path) -> Result<Self, MlError> {
        let file = std::fs::File::open(path).map_err(|e| {
            MlError::dataset(format!("failed to open {}: {e}", path.display()))
        })?;
        let frame = Self::from_reader(file)?;
        tracing::debug!(
            path = %path.display(),
            rows = frame.row_count(),
            columns = frame.column_count(),
            "loaded CSV"
        );
        Ok(frame)
    }

    /// Read a CSV and infer numeric columns.
    pub fn read_csv_typed(path: &Path) -> Result<Self, MlError> {
        let mut frame = Self::read_csv(path)?;
        frame.infer_types();
        Ok(frame)
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>, MlError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(Cell::to_field))?;
        }
        writer
            .into_inner()
            .map_err(|e| MlError::dataset(format!("failed to flush CSV buffer: {e}")))
    }

    /// Write the frame as CSV, creating parent directories as needed.
    pub fn write_csv(&self, path: &Path) -> Result<(), MlError> {
        let bytes = self.to_csv_bytes()?;
        motoval_core::persistence::write_file(path, &bytes)?;
        Ok(())
    }
}
