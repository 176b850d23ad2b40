//! Extracted field types: the shape the document service hands to the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel the service (and every display surface) uses for absent values.
pub const NOT_AVAILABLE: &str = "N/A";

/// True for the "not available" sentinel, blank cells included.
pub fn is_not_available(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case(NOT_AVAILABLE)
}

/// One row of an extracted table: column name -> raw cell text.
pub type Row = BTreeMap<String, String>;

/// All fields of one analyzed document, keyed by field name.
pub type FieldMap = BTreeMap<String, ExtractedField>;

/// Build a row from `(column, cell)` pairs.
pub fn row<K, V>(cells: impl IntoIterator<Item = (K, V)>) -> Row
where
    K: Into<String>,
    V: Into<String>,
{
    cells
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Ordered rows of a table field. Column sets may differ between rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl RowTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut table = Self::new();
        for r in rows {
            table.push_row(r);
        }
        table
    }

    /// Empty table with a fixed column order.
    pub fn with_columns(columns: impl IntoIterator<Item = String>) -> Self {
        let mut table = Self::new();
        for c in columns {
            if !table.columns.contains(&c) {
                table.columns.push(c);
            }
        }
        table
    }

    /// Append a row, registering any columns not seen before.
    pub fn push_row(&mut self, row: Row) {
        for name in row.keys() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.clone());
            }
        }
        self.rows.push(row);
    }

    /// Column names ordered by the row that first introduced them. Columns
    /// introduced by the same row come in name order, since a `Row` is keyed
    /// by name and keeps no source order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, or the sentinel when the row lacks the column.
    pub fn cell(&self, row: usize, column: &str) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or(NOT_AVAILABLE)
    }
}

/// Value of an extracted field after the wire shape has been interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Table(RowTable),
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Table,
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Table(_) => FieldKind::Table,
            FieldValue::Text(_) | FieldValue::Number(_) | FieldValue::Missing => FieldKind::Scalar,
        }
    }

    /// Human-readable rendering used by display surfaces.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(s) if !is_not_available(s) => s.trim().to_string(),
            FieldValue::Text(_) | FieldValue::Missing => NOT_AVAILABLE.to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::Table(t) => format!("[table: {} rows]", t.len()),
        }
    }
}

/// A single field produced by the extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: FieldValue,
    /// Extraction confidence (0.0 - 1.0)
    pub confidence: f64,
}

impl ExtractedField {
    pub fn new(name: impl Into<String>, value: FieldValue, confidence: f64) -> Self {
        Self {
            name: name.into(),
            value,
            confidence,
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>, confidence: f64) -> Self {
        Self::new(name, FieldValue::Text(value.into()), confidence)
    }

    pub fn table(name: impl Into<String>, table: RowTable) -> Self {
        Self::new(name, FieldValue::Table(table), 1.0)
    }

    pub fn kind(&self) -> FieldKind {
        self.value.kind()
    }
}

/// Collect fields into a map keyed by their names.
pub fn field_map(fields: impl IntoIterator<Item = ExtractedField>) -> FieldMap {
    fields.into_iter().map(|f| (f.name.clone(), f)).collect()
}
