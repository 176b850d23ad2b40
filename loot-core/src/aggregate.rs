//! Per-file aggregation of table metrics and gated scalar fields.

use serde::{Deserialize, Serialize};

use crate::classify::{Classified, ClassifiedScalar, DepositMetric, TableRole};
use crate::field::FieldValue;
use crate::metrics::PartialMetrics;
use crate::normalize::coerce_amount;
use crate::summary::{DepositSource, FileSummary, TableBreakdown};
use crate::template::StatementTemplate;

/// How per-table average balances combine across a multi-page statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MeanPolicy {
    /// Plain mean of the per-table means. Biased when tables differ in length;
    /// kept because existing reports were produced this way.
    #[default]
    MeanOfMeans,
    /// Mean over every sample of every table.
    Weighted,
}

fn scalar_amount(scalar: &ClassifiedScalar) -> Option<f64> {
    match &scalar.field.value {
        FieldValue::Number(n) => Some(*n),
        FieldValue::Text(s) => coerce_amount(s),
        FieldValue::Table(_) | FieldValue::Missing => None,
    }
}

fn scalar_count(scalar: &ClassifiedScalar) -> Option<u32> {
    let n = scalar_amount(scalar)?;
    if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}

/// Drop the statement's closing balance: the last valid row of the last
/// balance table that has one.
fn drop_closing_row(metrics: &[PartialMetrics], template: &StatementTemplate) -> Vec<PartialMetrics> {
    let mut adjusted = metrics.to_vec();
    if let Some(last) = adjusted
        .iter_mut()
        .rev()
        .find(|m| m.role == TableRole::Balance && m.balance.is_available())
    {
        last.balance = last.balance.without_closing_row(template.day_count);
    }
    adjusted
}

fn apply_balances(summary: &mut FileSummary, metrics: &[PartialMetrics], policy: MeanPolicy) {
    let tables: Vec<_> = metrics
        .iter()
        .filter(|m| m.role == TableRole::Balance && m.balance.is_available())
        .map(|m| &m.balance)
        .collect();

    for m in metrics {
        if m.role == TableRole::Balance && !m.balance.is_available() {
            summary
                .notes
                .push(format!("balance table '{}' had no usable values", m.table));
        }
    }

    if tables.is_empty() {
        if !metrics.iter().any(|m| m.role == TableRole::Balance) {
            summary.notes.push("no balance table found".to_string());
        }
        return;
    }

    let total: f64 = tables.iter().filter_map(|b| b.total).sum();
    let samples: usize = tables.iter().map(|b| b.samples).sum();
    let average = match policy {
        MeanPolicy::MeanOfMeans => {
            tables.iter().filter_map(|b| b.average).sum::<f64>() / tables.len() as f64
        }
        MeanPolicy::Weighted => total / samples as f64,
    };
    let negative_days: u32 = tables.iter().filter_map(|b| b.negative_days).sum();
    let day_count: usize = tables.iter().map(|b| b.day_count).sum();

    summary.total_balance = Some(total);
    summary.average_balance = Some(average);
    summary.negative_days = Some(negative_days);
    summary.negative_day_pct =
        (day_count > 0).then(|| negative_days as f64 / day_count as f64 * 100.0);
    summary.balance_tables = tables.len();
}

fn apply_deposits(summary: &mut FileSummary, classified: &Classified, metrics: &[PartialMetrics]) {
    for (scalar, metric) in classified.rejected_scalars() {
        summary.notes.push(format!(
            "{} field '{}' ignored: confidence {:.2} below gate",
            match metric {
                DepositMetric::Amount => "deposit amount",
                DepositMetric::Count => "deposit count",
            },
            scalar.field.name,
            scalar.field.confidence
        ));
    }

    let scalar_total = classified.deposit_scalar(DepositMetric::Amount).and_then(|s| {
        let v = scalar_amount(s);
        if v.is_none() {
            summary
                .notes
                .push(format!("deposit amount field '{}' is not a number", s.field.name));
        }
        v
    });
    let scalar_count = classified.deposit_scalar(DepositMetric::Count).and_then(|s| {
        let v = scalar_count(s);
        if v.is_none() {
            summary
                .notes
                .push(format!("deposit count field '{}' is not a whole number", s.field.name));
        }
        v
    });

    let tables: Vec<_> = metrics
        .iter()
        .filter(|m| m.deposits.is_available())
        .map(|m| &m.deposits)
        .collect();
    let (table_total, table_count) = if tables.is_empty() {
        (None, None)
    } else {
        (
            Some(tables.iter().filter_map(|d| d.total).sum::<f64>()),
            Some(tables.iter().filter_map(|d| d.count).sum::<u32>()),
        )
    };

    let source = |scalar: bool, table: bool| match (scalar, table) {
        (true, _) => Some(DepositSource::Scalar),
        (false, true) => Some(DepositSource::Table),
        (false, false) => None,
    };
    let amount_source = source(scalar_total.is_some(), table_total.is_some());
    let count_source = source(scalar_count.is_some(), table_count.is_some());

    summary.total_deposits = scalar_total.or(table_total);
    summary.deposit_count = scalar_count.or(table_count);
    summary.deposit_source = match (amount_source, count_source) {
        (Some(a), Some(c)) if a != c => Some(DepositSource::Mixed),
        (a, c) => a.or(c),
    };
}

pub fn aggregate(
    file_name: &str,
    classified: &Classified,
    metrics: &[PartialMetrics],
    template: &StatementTemplate,
    policy: MeanPolicy,
) -> FileSummary {
    let metrics = if template.exclude_closing_row {
        drop_closing_row(metrics, template)
    } else {
        metrics.to_vec()
    };

    let mut summary = FileSummary::empty(file_name, template.id);
    apply_balances(&mut summary, &metrics, policy);
    apply_deposits(&mut summary, classified, &metrics);
    summary.tables = metrics.iter().map(TableBreakdown::from).collect();
    summary.raw_fields = classified.raw_fields();
    summary
}
