use loot_core::FileSummary;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One uploaded statement: a display name and the PDF bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl StatementInput {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn read(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, auth, quota or polling failure.
    Transport,
    /// The service ran but reported a failed analysis.
    Analysis,
    NoDocuments,
    /// Anything else that escaped processing of the file (panics included).
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file_name: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Result of processing one file; a failure never stops the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Summary(FileSummary),
    Failed(FileFailure),
}

impl FileOutcome {
    pub fn failed(file_name: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        FileOutcome::Failed(FileFailure {
            file_name: file_name.into(),
            kind,
            message: message.into(),
        })
    }

    pub fn file_name(&self) -> &str {
        match self {
            FileOutcome::Summary(s) => &s.file_name,
            FileOutcome::Failed(f) => &f.file_name,
        }
    }

    pub fn summary(&self) -> Option<&FileSummary> {
        match self {
            FileOutcome::Summary(s) => Some(s),
            FileOutcome::Failed(_) => None,
        }
    }
}
