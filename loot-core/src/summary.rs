//! File-level summary record handed to display and export surfaces.

use serde::{Deserialize, Serialize};

use crate::classify::TableRole;
use crate::field::{FieldMap, NOT_AVAILABLE};
use crate::metrics::PartialMetrics;

/// Where the reported deposit figures came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositSource {
    Scalar,
    Table,
    /// One metric from a gated scalar, the other from tables.
    Mixed,
}

/// Figures of one extracted table, as computed before aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableBreakdown {
    pub name: String,
    pub role: TableRole,
    pub balance_samples: usize,
    pub total_balance: Option<f64>,
    pub average_balance: Option<f64>,
    pub negative_days: Option<u32>,
    pub total_deposits: Option<f64>,
    pub deposit_count: Option<u32>,
}

impl From<&PartialMetrics> for TableBreakdown {
    fn from(m: &PartialMetrics) -> Self {
        Self {
            name: m.table.clone(),
            role: m.role,
            balance_samples: m.balance.samples,
            total_balance: m.balance.total,
            average_balance: m.balance.average,
            negative_days: m.balance.negative_days,
            total_deposits: m.deposits.total,
            deposit_count: m.deposits.count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub file_name: String,
    /// Statement template the metrics were computed with.
    pub template: String,
    pub total_deposits: Option<f64>,
    pub deposit_count: Option<u32>,
    pub deposit_source: Option<DepositSource>,
    pub total_balance: Option<f64>,
    pub average_balance: Option<f64>,
    pub negative_days: Option<u32>,
    pub negative_day_pct: Option<f64>,
    /// Balance tables that produced at least one sample.
    pub balance_tables: usize,
    /// Per-table figures, e.g. deposits per transaction-history page.
    pub tables: Vec<TableBreakdown>,
    pub notes: Vec<String>,
    pub raw_fields: FieldMap,
}

impl FileSummary {
    /// Summary with every metric "not available".
    pub fn empty(file_name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            template: template.into(),
            total_deposits: None,
            deposit_count: None,
            deposit_source: None,
            total_balance: None,
            average_balance: None,
            negative_days: None,
            negative_day_pct: None,
            balance_tables: 0,
            tables: Vec::new(),
            notes: Vec::new(),
            raw_fields: FieldMap::new(),
        }
    }

    /// Labelled metric values as displayed ("N/A" when absent).
    pub fn metric_rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Total Deposit Amount", money(self.total_deposits)),
            ("Number of Deposits", count(self.deposit_count)),
            ("Total Daily Balance", money(self.total_balance)),
            ("Average Daily Balance", money(self.average_balance)),
            ("Negative Balance Days", count(self.negative_days)),
            ("Average Negative Days", percent(self.negative_day_pct)),
        ]
    }
}

pub fn money(value: Option<f64>) -> String {
    match value {
        Some(v) if v < 0.0 => format!("-${:.2}", v.abs()),
        Some(v) => format!("${:.2}", v),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn count(value: Option<u32>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

pub fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| format!("{:.2}%", v))
}
