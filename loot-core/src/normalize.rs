//! Table normalization: canonical column names and currency coercion.
//!
//! Nothing in here fails. A cell that cannot be read as a number becomes
//! `None` and is left for the metric code to skip.

use serde::Serialize;

use crate::field::{is_not_available, Row, RowTable, NOT_AVAILABLE};
use crate::template::ColumnFamilies;

/// Fold a column name so "Amount_1", "amount 1" and "AMOUNT1" compare equal.
pub fn canonical_column(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '_' | '-' | '.' | '/'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Trailing index digits of a canonical name ("amount12" -> "12").
pub fn column_suffix(canonical: &str) -> &str {
    let stem = canonical.trim_end_matches(|c: char| c.is_ascii_digit());
    &canonical[stem.len()..]
}

/// Parse a currency-formatted cell: "$1,234.56", "(50.00)", "50.00-".
pub fn coerce_amount(raw: &str) -> Option<f64> {
    if is_not_available(raw) {
        return None;
    }
    let s = raw.trim();
    let (parenthesized, body) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };

    let mut cleaned: String = body
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();

    // "50.00-" trailing-minus notation
    let mut trailing_minus = false;
    if cleaned.len() > 1 && cleaned.ends_with('-') && !cleaned[..cleaned.len() - 1].contains('-') {
        cleaned.pop();
        trailing_minus = true;
    }

    let value: f64 = cleaned.parse().ok()?;
    if parenthesized || trailing_minus {
        Some(-value.abs())
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "cells", rename_all = "snake_case")]
pub enum ColumnValues {
    Text(Vec<String>),
    Amounts(Vec<Option<f64>>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedColumn {
    /// Column name as extracted.
    pub name: String,
    pub canonical: String,
    pub values: ColumnValues,
}

impl NormalizedColumn {
    pub fn is_monetary(&self) -> bool {
        matches!(self.values, ColumnValues::Amounts(_))
    }

    /// Numeric cell; `None` for text columns and unparseable cells.
    pub fn amount(&self, row: usize) -> Option<f64> {
        match &self.values {
            ColumnValues::Amounts(v) => v.get(row).copied().flatten(),
            ColumnValues::Text(_) => None,
        }
    }

    pub fn text(&self, row: usize) -> Option<&str> {
        match &self.values {
            ColumnValues::Text(v) => v.get(row).map(String::as_str),
            ColumnValues::Amounts(_) => None,
        }
    }

    /// Render a cell the way it would appear in a raw table.
    fn render(&self, row: usize) -> String {
        match &self.values {
            ColumnValues::Text(v) => v.get(row).cloned().unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            ColumnValues::Amounts(v) => match v.get(row).copied().flatten() {
                Some(n) => n.to_string(),
                None => NOT_AVAILABLE.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedTable {
    columns: Vec<NormalizedColumn>,
    row_count: usize,
}

impl NormalizedTable {
    pub fn columns(&self) -> &[NormalizedColumn] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn column(&self, canonical: &str) -> Option<&NormalizedColumn> {
        self.columns.iter().find(|c| c.canonical == canonical)
    }

    /// Back to raw form; numbers are written without separators.
    pub fn to_row_table(&self) -> RowTable {
        let mut table = RowTable::with_columns(self.columns.iter().map(|c| c.name.clone()));
        for i in 0..self.row_count {
            table.push_row(
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), c.render(i)))
                    .collect::<Row>(),
            );
        }
        table
    }
}

pub fn normalize(table: &RowTable, families: &ColumnFamilies) -> NormalizedTable {
    let columns = table
        .columns()
        .iter()
        .map(|name| {
            let canonical = canonical_column(name);
            let cells = (0..table.len()).map(|i| table.cell(i, name));
            let values = if families.is_monetary(&canonical) {
                ColumnValues::Amounts(cells.map(coerce_amount).collect())
            } else {
                ColumnValues::Text(cells.map(|c| c.trim().to_string()).collect())
            };
            NormalizedColumn {
                name: name.clone(),
                canonical,
                values,
            }
        })
        .collect();

    NormalizedTable {
        columns,
        row_count: table.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::row;
    use crate::template::StatementTemplate;

    #[test]
    fn test_canonical_column_variants() {
        assert_eq!(canonical_column("Amount_1"), "amount1");
        assert_eq!(canonical_column(" amount 1 "), "amount1");
        assert_eq!(canonical_column("AMOUNT1"), "amount1");
        assert_eq!(canonical_column("Ending daily balance"), "endingdailybalance");
        assert_eq!(canonical_column("Deposits/Credits"), "depositscredits");
    }

    #[test]
    fn test_column_suffix() {
        assert_eq!(column_suffix("amount12"), "12");
        assert_eq!(column_suffix("date"), "");
    }

    #[test]
    fn test_coerce_amount() {
        assert_eq!(coerce_amount("1,000.00"), Some(1000.0));
        assert_eq!(coerce_amount("$-50.00"), Some(-50.0));
        assert_eq!(coerce_amount("(75.25)"), Some(-75.25));
        assert_eq!(coerce_amount("12.50-"), Some(-12.5));
        assert_eq!(coerce_amount(" $ 3 "), Some(3.0));
    }

    #[test]
    fn test_unparseable_amounts_are_null_not_zero() {
        assert_eq!(coerce_amount("N/A"), None);
        assert_eq!(coerce_amount(""), None);
        assert_eq!(coerce_amount("-"), None);
        assert_eq!(coerce_amount("1.2.3"), None);
        assert_eq!(coerce_amount("pending"), None);
    }

    #[test]
    fn test_normalize_coerces_only_monetary_columns() {
        let t = StatementTemplate::generic().unwrap();
        let table = RowTable::from_rows([
            row([("Date", "1/1"), ("Amount", "$1,000.00")]),
            row([("Date", "1/2")]),
        ]);
        let n = normalize(&table, &t.columns);
        assert_eq!(n.row_count(), 2);

        let amount = n.column("amount").unwrap();
        assert!(amount.is_monetary());
        assert_eq!(amount.amount(0), Some(1000.0));
        assert_eq!(amount.amount(1), None);

        let date = n.column("date").unwrap();
        assert_eq!(date.text(1), Some("1/2"));
        assert_eq!(date.amount(0), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let t = StatementTemplate::generic().unwrap();
        let table = RowTable::from_rows([
            row([("Date", "1/1"), ("Amount", "1,000.10"), ("Amount_1", "(2.5)")]),
            row([("Date", "N/A"), ("Amount", "N/A")]),
            row([("Date", "1/3"), ("Amount", "0.1"), ("Amount_1", "junk")]),
        ]);
        let once = normalize(&table, &t.columns);
        let twice = normalize(&once.to_row_table(), &t.columns);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_table() {
        let t = StatementTemplate::generic().unwrap();
        let n = normalize(&RowTable::new(), &t.columns);
        assert!(n.is_empty());
        assert!(n.columns().is_empty());
    }
}
