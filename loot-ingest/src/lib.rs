//! loot-ingest: extraction service client, wire contract and concurrent batch processing.

pub mod analyzer;
pub mod batch;
pub mod error;
pub mod retry;
pub mod types;
pub mod wire;

pub use analyzer::{AzureAnalyzer, DocumentAnalyzer, ServiceConfig, DEFAULT_API_VERSION};
pub use batch::{process_batch, summarize_document, summarize_saved, BatchOptions, DEFAULT_WORKERS};
pub use error::ExtractError;
pub use retry::RetryPolicy;
pub use types::{FailureKind, FileFailure, FileOutcome, StatementInput};
pub use wire::{document_fields, parse_saved_result, AnalyzedDocument};
