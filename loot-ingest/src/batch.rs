//! Concurrent batch processing: one outcome per input, in input order.

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use loot_core::{summarize_fields, FileSummary, MeanPolicy, StatementTemplate};
use std::panic::AssertUnwindSafe;
use tracing::{info, warn};

use crate::analyzer::DocumentAnalyzer;
use crate::error::ExtractError;
use crate::types::{FailureKind, FileOutcome, StatementInput};
use crate::wire::{document_fields, parse_saved_result, AnalyzedDocument};

/// Files are analyzed one at a time unless configured otherwise.
pub const DEFAULT_WORKERS: usize = 1;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub model_id: String,
    pub template: StatementTemplate,
    pub mean_policy: MeanPolicy,
    /// Files in flight at once. Zero behaves like one.
    pub workers: usize,
}

impl BatchOptions {
    pub fn new(model_id: impl Into<String>, template: StatementTemplate) -> Self {
        Self {
            model_id: model_id.into(),
            mean_policy: template.mean_policy,
            template,
            workers: DEFAULT_WORKERS,
        }
    }
}

pub fn summarize_document(
    file_name: &str,
    doc: &AnalyzedDocument,
    template: &StatementTemplate,
    policy: MeanPolicy,
) -> FileSummary {
    summarize_fields(file_name, &document_fields(doc), template, policy)
}

/// Summarize a saved analyze response without calling the service.
pub fn summarize_saved(
    file_name: &str,
    json: &str,
    template: &StatementTemplate,
    policy: MeanPolicy,
) -> FileOutcome {
    match parse_saved_result(json) {
        Ok(doc) => FileOutcome::Summary(summarize_document(file_name, &doc, template, policy)),
        Err(e) => FileOutcome::failed(file_name, e.failure_kind(), e.to_string()),
    }
}

async fn process_one<A: DocumentAnalyzer>(
    analyzer: &A,
    input: &StatementInput,
    opts: &BatchOptions,
) -> Result<FileSummary, ExtractError> {
    let doc = analyzer.analyze(&opts.model_id, &input.bytes).await?;
    Ok(summarize_document(&input.name, &doc, &opts.template, opts.mean_policy))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic while processing file".to_string())
}

/// Process every input with at most `opts.workers` files in flight.
///
/// A failure, panic included, is recorded against its own file and never
/// affects the others.
pub async fn process_batch<A: DocumentAnalyzer + Sync>(
    analyzer: &A,
    inputs: &[StatementInput],
    opts: &BatchOptions,
) -> Vec<FileOutcome> {
    info!(files = inputs.len(), workers = opts.workers.max(1), "starting batch");

    stream::iter(inputs)
        .map(move |input| async move {
            let result = AssertUnwindSafe(process_one(analyzer, input, opts))
                .catch_unwind()
                .await;
            match result {
                Ok(Ok(summary)) => {
                    info!(file = %input.name, notes = summary.notes.len(), "summarized");
                    FileOutcome::Summary(summary)
                }
                Ok(Err(e)) => {
                    warn!(file = %input.name, error = %e, "extraction failed");
                    FileOutcome::failed(&input.name, e.failure_kind(), e.to_string())
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(file = %input.name, %message, "processing panicked");
                    FileOutcome::failed(&input.name, FailureKind::Unexpected, message)
                }
            }
        })
        .buffered(opts.workers.max(1))
        .collect()
        .await
}
