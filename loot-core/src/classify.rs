//! Field classification: decide what each extracted field is for.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::field::{ExtractedField, FieldMap, FieldValue, RowTable};
use crate::template::StatementTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositMetric {
    Amount,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarRole {
    /// Deposit metric that passed the confidence gate.
    Deposit(DepositMetric),
    /// Deposit metric alias whose confidence was under the gate.
    BelowGate(DepositMetric),
    /// Statement metadata kept for display only.
    Display,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableRole {
    Balance,
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedScalar {
    pub field: ExtractedField,
    pub role: ScalarRole,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedTable {
    pub name: String,
    pub table: RowTable,
    pub confidence: f64,
    pub role: TableRole,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classified {
    pub scalars: BTreeMap<String, ClassifiedScalar>,
    pub tables: BTreeMap<String, ClassifiedTable>,
}

impl Classified {
    /// First gated scalar for a deposit metric, in field-name order.
    pub fn deposit_scalar(&self, metric: DepositMetric) -> Option<&ClassifiedScalar> {
        self.scalars
            .values()
            .find(|s| s.role == ScalarRole::Deposit(metric))
    }

    pub fn rejected_scalars(&self) -> impl Iterator<Item = (&ClassifiedScalar, DepositMetric)> {
        self.scalars.values().filter_map(|s| match s.role {
            ScalarRole::BelowGate(metric) => Some((s, metric)),
            _ => None,
        })
    }

    pub fn balance_tables(&self) -> impl Iterator<Item = &ClassifiedTable> {
        self.tables.values().filter(|t| t.role == TableRole::Balance)
    }

    /// Every field as it came from the service, for raw display.
    pub fn raw_fields(&self) -> FieldMap {
        let scalars = self
            .scalars
            .iter()
            .map(|(name, s)| (name.clone(), s.field.clone()));
        let tables = self.tables.iter().map(|(name, t)| {
            (
                name.clone(),
                ExtractedField::new(name.clone(), FieldValue::Table(t.table.clone()), t.confidence),
            )
        });
        scalars.chain(tables).collect()
    }
}

fn scalar_role(name: &str, field: &ExtractedField, template: &StatementTemplate) -> ScalarRole {
    let metric = if template.is_deposit_amount_alias(name) {
        DepositMetric::Amount
    } else if template.is_deposit_count_alias(name) {
        DepositMetric::Count
    } else {
        return ScalarRole::Display;
    };

    if field.confidence >= template.confidence_gate {
        ScalarRole::Deposit(metric)
    } else {
        debug!(
            field = name,
            confidence = field.confidence,
            gate = template.confidence_gate,
            "deposit field below confidence gate"
        );
        ScalarRole::BelowGate(metric)
    }
}

pub fn classify(fields: &FieldMap, template: &StatementTemplate) -> Classified {
    let mut out = Classified::default();

    for (name, field) in fields {
        match &field.value {
            FieldValue::Table(table) => {
                let role = if template.is_balance_table(name) {
                    TableRole::Balance
                } else {
                    TableRole::Plain
                };
                out.tables.insert(
                    name.clone(),
                    ClassifiedTable {
                        name: name.clone(),
                        table: table.clone(),
                        confidence: field.confidence,
                        role,
                    },
                );
            }
            FieldValue::Text(_) | FieldValue::Number(_) => {
                let role = scalar_role(name, field, template);
                out.scalars.insert(
                    name.clone(),
                    ClassifiedScalar {
                        field: field.clone(),
                        role,
                    },
                );
            }
            FieldValue::Missing => {
                debug!(field = %name, "malformed field value, keeping as N/A");
                out.scalars.insert(
                    name.clone(),
                    ClassifiedScalar {
                        field: field.clone(),
                        role: ScalarRole::Display,
                    },
                );
            }
        }
    }

    out
}
