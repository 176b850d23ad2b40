//! Wire contract of the document analysis service (analyze operation JSON).
//!
//! Every key is optional on the wire. The shape of a field is read once here
//! and turned into a [`FieldValue`]; nothing downstream inspects JSON.

use loot_core::{ExtractedField, FieldMap, FieldValue, Row, RowTable, NOT_AVAILABLE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::ExtractError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeOperation {
    pub status: String,
    pub analyze_result: Option<AnalyzeResult>,
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeResult {
    pub model_id: String,
    pub documents: Vec<AnalyzedDocument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzedDocument {
    pub doc_type: String,
    pub fields: BTreeMap<String, DocumentField>,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocumentField {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value_string: Option<String>,
    pub value_number: Option<f64>,
    pub value_integer: Option<i64>,
    pub value_date: Option<String>,
    pub value_array: Option<Vec<DocumentField>>,
    pub value_object: Option<BTreeMap<String, DocumentField>>,
    pub content: Option<String>,
    pub confidence: Option<f64>,
}

fn non_blank(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl DocumentField {
    fn number(&self) -> Option<f64> {
        self.value_number
            .or_else(|| self.value_integer.map(|i| i as f64))
    }

    fn text(&self) -> Option<String> {
        non_blank(&self.value_string)
            .or_else(|| non_blank(&self.value_date))
            .or_else(|| non_blank(&self.content))
    }

    /// Cell text of a table row entry; unknown shapes read as "N/A".
    pub fn cell_text(&self) -> String {
        non_blank(&self.value_string)
            .or_else(|| non_blank(&self.content))
            .or_else(|| self.number().map(|n| n.to_string()))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    fn rows(items: &[DocumentField]) -> RowTable {
        let mut table = RowTable::new();
        for item in items {
            match &item.value_object {
                Some(cells) => table.push_row(
                    cells
                        .iter()
                        .map(|(col, cell)| (col.clone(), cell.cell_text()))
                        .collect::<Row>(),
                ),
                None => debug!(kind = ?item.kind, "skipping array item without valueObject"),
            }
        }
        table
    }

    /// Interpret the field by its declared type, then by whichever value key is present.
    pub fn to_value(&self) -> FieldValue {
        let declared = match self.kind.as_deref() {
            Some("array") => self.value_array.as_deref().map(|a| FieldValue::Table(Self::rows(a))),
            Some("string") | Some("date") | Some("time") | Some("phoneNumber") => {
                self.text().map(FieldValue::Text)
            }
            Some("number") | Some("integer") | Some("float") => {
                self.number().map(FieldValue::Number)
            }
            _ => None,
        };

        declared
            .or_else(|| self.value_array.as_deref().map(|a| FieldValue::Table(Self::rows(a))))
            .or_else(|| self.text().map(FieldValue::Text))
            .or_else(|| self.number().map(FieldValue::Number))
            .unwrap_or(FieldValue::Missing)
    }
}

/// Fields of an analyzed document in pipeline form.
pub fn document_fields(doc: &AnalyzedDocument) -> FieldMap {
    doc.fields
        .iter()
        .map(|(name, field)| {
            (
                name.clone(),
                ExtractedField::new(name.clone(), field.to_value(), field.confidence.unwrap_or(0.0)),
            )
        })
        .collect()
}

impl AnalyzeResult {
    pub fn into_first_document(self) -> Result<AnalyzedDocument, ExtractError> {
        self.documents.into_iter().next().ok_or(ExtractError::NoDocuments)
    }
}

impl AnalyzeOperation {
    /// Terminal operation states: `Some` once the service is done.
    pub fn finished(self) -> Option<Result<AnalyzedDocument, ExtractError>> {
        match self.status.as_str() {
            "succeeded" => Some(
                self.analyze_result
                    .ok_or(ExtractError::NoDocuments)
                    .and_then(AnalyzeResult::into_first_document),
            ),
            "failed" | "canceled" => {
                let message = self
                    .error
                    .map(|e| format!("{} {}", e.code, e.message).trim().to_string())
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "unknown error".to_string());
                Some(Err(ExtractError::AnalysisFailed(message)))
            }
            _ => None,
        }
    }
}

/// Read a saved analyze response: either the polled operation or a bare `analyzeResult`.
pub fn parse_saved_result(json: &str) -> Result<AnalyzedDocument, ExtractError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    if value.get("analyzeResult").is_some() || value.get("status").is_some() {
        let op: AnalyzeOperation = serde_json::from_value(value)?;
        op.finished()
            .unwrap_or_else(|| Err(ExtractError::AnalysisFailed("analysis still running".to_string())))
    } else {
        let result: AnalyzeResult = serde_json::from_value(value)?;
        result.into_first_document()
    }
}
