//! Per-table metrics: balance statistics and deposit detection.
//!
//! A sample is only read from a valid row: one whose paired date cell is not
//! "N/A". Tables without a date column treat every row as valid.

use serde::Serialize;
use tracing::debug;

use crate::classify::TableRole;
use crate::field::is_not_available;
use crate::normalize::{column_suffix, NormalizedColumn, NormalizedTable};
use crate::template::{ColumnFamilies, DayCountMode, StatementTemplate};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceMetrics {
    pub total: Option<f64>,
    pub average: Option<f64>,
    pub negative_days: Option<u32>,
    pub negative_day_pct: Option<f64>,
    /// Flattened count of balance values used.
    pub samples: usize,
    /// Denominator of `negative_day_pct`.
    pub day_count: usize,
    /// Valid rows' samples in table order.
    #[serde(skip)]
    pub rows: Vec<Vec<f64>>,
}

impl BalanceMetrics {
    pub fn is_available(&self) -> bool {
        self.average.is_some()
    }

    /// Statistics over per-row samples; rows without samples are ignored.
    pub fn from_rows(rows: Vec<Vec<f64>>, day_count: DayCountMode) -> Self {
        let rows: Vec<Vec<f64>> = rows.into_iter().filter(|r| !r.is_empty()).collect();
        let samples = rows.iter().map(Vec::len).sum::<usize>();
        if samples == 0 {
            return Self::default();
        }

        let total: f64 = rows.iter().flatten().sum();
        // a row is one day no matter how many of its columns are negative
        let negative_days = rows.iter().filter(|r| r.iter().any(|v| *v < 0.0)).count();
        let days = match day_count {
            DayCountMode::Samples => samples,
            DayCountMode::Rows => rows.len(),
        };

        Self {
            total: Some(total),
            average: Some(total / samples as f64),
            negative_days: Some(negative_days as u32),
            negative_day_pct: Some(negative_days as f64 / days as f64 * 100.0),
            samples,
            day_count: days,
            rows,
        }
    }

    /// Same statistics with the last valid row dropped.
    pub fn without_closing_row(&self, day_count: DayCountMode) -> Self {
        let mut rows = self.rows.clone();
        rows.pop();
        Self::from_rows(rows, day_count)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DepositMetrics {
    pub total: Option<f64>,
    pub count: Option<u32>,
}

impl DepositMetrics {
    pub fn is_available(&self) -> bool {
        self.count.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialMetrics {
    pub table: String,
    pub role: TableRole,
    pub balance: BalanceMetrics,
    pub deposits: DepositMetrics,
}

/// Date column sharing the sample column's index suffix, else the first one.
fn date_partner<'a>(
    table: &'a NormalizedTable,
    column: &NormalizedColumn,
    families: &ColumnFamilies,
) -> Option<&'a NormalizedColumn> {
    let suffix = column_suffix(&column.canonical);
    let mut dates = table
        .columns()
        .iter()
        .filter(|c| !c.is_monetary() && families.is_date(&c.canonical));
    let first = dates.clone().next();
    dates
        .find(|d| column_suffix(&d.canonical) == suffix)
        .or(first)
}

struct SampleColumn<'a> {
    column: &'a NormalizedColumn,
    date: Option<&'a NormalizedColumn>,
}

impl SampleColumn<'_> {
    fn row_is_valid(&self, row: usize) -> bool {
        match self.date {
            Some(d) => d.text(row).is_some_and(|t| !is_not_available(t)),
            None => true,
        }
    }
}

fn sample_columns<'a>(
    table: &'a NormalizedTable,
    families: &ColumnFamilies,
    matches: impl Fn(&str) -> bool,
) -> Vec<SampleColumn<'a>> {
    table
        .columns()
        .iter()
        .filter(|c| c.is_monetary() && matches(&c.canonical))
        .map(|column| SampleColumn {
            column,
            date: date_partner(table, column, families),
        })
        .collect()
}

pub fn balance_metrics(table: &NormalizedTable, template: &StatementTemplate) -> BalanceMetrics {
    let families = &template.columns;
    let columns = sample_columns(table, families, |c| families.is_balance(c));
    if columns.is_empty() || table.is_empty() {
        return BalanceMetrics::default();
    }

    let rows: Vec<Vec<f64>> = (0..table.row_count())
        .map(|i| {
            columns
                .iter()
                .filter(|s| s.row_is_valid(i))
                .filter_map(|s| template.balance_missing.apply(s.column.amount(i)))
                .collect::<Vec<f64>>()
        })
        .collect();

    BalanceMetrics::from_rows(rows, template.day_count)
}

pub fn deposit_metrics(table: &NormalizedTable, template: &StatementTemplate) -> DepositMetrics {
    let families = &template.columns;
    let columns = sample_columns(table, families, |c| families.is_deposit(c));
    if columns.is_empty() || table.is_empty() {
        return DepositMetrics::default();
    }

    let mut count = 0u32;
    let mut total = 0.0;
    for i in 0..table.row_count() {
        let credits: Vec<f64> = columns
            .iter()
            .filter(|s| s.row_is_valid(i))
            .filter_map(|s| template.deposit_missing.apply(s.column.amount(i)))
            .filter(|v| *v != 0.0)
            .collect();
        if !credits.is_empty() {
            count += 1;
            total += credits.iter().sum::<f64>();
        }
    }

    DepositMetrics {
        total: Some(total),
        count: Some(count),
    }
}

/// Metrics for one normalized table. Balance statistics only come from
/// balance-role tables; deposits are read from any table with deposit columns.
pub fn compute_metrics(
    name: &str,
    table: &NormalizedTable,
    role: TableRole,
    template: &StatementTemplate,
) -> PartialMetrics {
    let balance = match role {
        TableRole::Balance => balance_metrics(table, template),
        TableRole::Plain => BalanceMetrics::default(),
    };
    let deposits = deposit_metrics(table, template);

    if role == TableRole::Balance && !balance.is_available() {
        debug!(table = name, rows = table.row_count(), "balance table yielded no samples");
    }

    PartialMetrics {
        table: name.to_string(),
        role,
        balance,
        deposits,
    }
}
