//! loot-core: statement field classification and balance/deposit metrics

pub mod aggregate;
pub mod classify;
pub mod field;
pub mod metrics;
pub mod normalize;
pub mod summary;
pub mod template;

pub use aggregate::{aggregate, MeanPolicy};
pub use classify::{classify, Classified, DepositMetric, ScalarRole, TableRole};
pub use field::{ExtractedField, FieldKind, FieldMap, FieldValue, Row, RowTable, NOT_AVAILABLE};
pub use metrics::{compute_metrics, BalanceMetrics, DepositMetrics, PartialMetrics};
pub use normalize::{canonical_column, coerce_amount, normalize, NormalizedTable};
pub use summary::{DepositSource, FileSummary, TableBreakdown};
pub use template::{
    template_by_id, ColumnFamilies, DayCountMode, MissingPolicy, StatementTemplate, TemplateError,
};

/// Run the whole pipeline over one document's fields.
///
/// Pure: malformed or missing input degrades to "N/A" metrics and notes on
/// the returned summary, never to an error.
pub fn summarize_fields(
    file_name: &str,
    fields: &FieldMap,
    template: &StatementTemplate,
    policy: MeanPolicy,
) -> FileSummary {
    let classified = classify(fields, template);
    let metrics: Vec<PartialMetrics> = classified
        .tables
        .values()
        .map(|t| {
            let table = normalize(&t.table, &template.columns);
            compute_metrics(&t.name, &table, t.role, template)
        })
        .collect();

    aggregate(file_name, &classified, &metrics, template, policy)
}
