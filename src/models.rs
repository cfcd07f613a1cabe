//! Core data models used throughout drive-extract.
//!
//! These types represent the file references, fetch results, normalized
//! content, and per-file outcomes that flow through the extraction pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::formats::Category;

/// A file in the remote store, as reported by the listing API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReference {
    /// Opaque remote identifier.
    pub id: String,
    /// Display name. May lack an extension or contain characters that are
    /// not valid in a local file name.
    pub name: String,
    /// Declared content type.
    pub mime_type: String,
}

/// How the remote API delivered a file's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseEncoding {
    /// Server-side export to a text format (`text/plain`, `text/csv`).
    ExportText,
    /// Server-side export that came back as a JSON document.
    ExportStructured,
    /// Raw stored bytes of a binary format.
    MediaBinary,
    /// Raw stored bytes of a text format.
    MediaText,
}

impl ResponseEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseEncoding::ExportText => "export-text",
            ResponseEncoding::ExportStructured => "export-structured",
            ResponseEncoding::MediaBinary => "media-binary",
            ResponseEncoding::MediaText => "media-text",
        }
    }
}

/// Chunked byte stream of a response body.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// The shapes a response body may take before normalization.
pub enum ResponseBody {
    /// Body already materialized in memory.
    Binary(Bytes),
    /// Body still on the wire; must be collected.
    Stream(ByteStream),
    /// Body decoded as text by the transport.
    Text(String),
    /// Body parsed as a structured document.
    Value(serde_json::Value),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Binary(b) => f.debug_tuple("Binary").field(&b.len()).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
            ResponseBody::Text(s) => f.debug_tuple("Text").field(&s.len()).finish(),
            ResponseBody::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// A single content download, not yet normalized.
#[derive(Debug)]
pub struct FetchResult {
    pub encoding: ResponseEncoding,
    pub body: ResponseBody,
}

/// Canonical input handed to an extractor: exactly one of bytes or text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedContent {
    Bytes(Vec<u8>),
    Text(String),
}

impl NormalizedContent {
    pub fn len(&self) -> usize {
        match self {
            NormalizedContent::Bytes(b) => b.len(),
            NormalizedContent::Text(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pipeline stage a file was in when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Classifying,
    Fetching,
    Normalizing,
    Extracting,
    Writing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Classifying => "classify",
            Stage::Fetching => "fetch",
            Stage::Normalizing => "normalize",
            Stage::Extracting => "extract",
            Stage::Writing => "write",
        };
        f.write_str(s)
    }
}

/// A text file written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Terminal state of one file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    SkippedUnsupported { reason: String },
    Failed { stage: Stage, error: String },
}

/// Result of processing one file.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub source: FileReference,
    pub category: Option<Category>,
    #[serde(flatten)]
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<OutputArtifact>,
}

impl ExtractionOutcome {
    pub fn success(source: FileReference, category: Category, artifact: OutputArtifact) -> Self {
        Self {
            source,
            category: Some(category),
            status: OutcomeStatus::Success,
            artifact: Some(artifact),
        }
    }

    pub fn skipped(source: FileReference, reason: impl Into<String>) -> Self {
        Self {
            source,
            category: None,
            status: OutcomeStatus::SkippedUnsupported {
                reason: reason.into(),
            },
            artifact: None,
        }
    }

    pub fn failed(
        source: FileReference,
        category: Option<Category>,
        stage: Stage,
        error: impl fmt::Display,
    ) -> Self {
        Self {
            source,
            category,
            status: OutcomeStatus::Failed {
                stage,
                error: error.to_string(),
            },
            artifact: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::SkippedUnsupported { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}

/// Summary of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cancelled: bool,
    /// Files handed to the run, settled or not.
    pub planned: usize,
    pub outcomes: Vec<ExtractionOutcome>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Files that never settled because the run was cancelled.
    pub fn abandoned(&self) -> usize {
        self.planned.saturating_sub(self.outcomes.len())
    }

    /// Artifact paths written by more than one file in this run, with the
    /// names of the files involved. Same-named files of one category share a
    /// path, so only the last write survives.
    pub fn shared_artifacts(&self) -> Vec<(PathBuf, Vec<String>)> {
        let mut by_path: BTreeMap<&PathBuf, Vec<String>> = BTreeMap::new();
        for outcome in &self.outcomes {
            if let Some(artifact) = &outcome.artifact {
                by_path
                    .entry(&artifact.path)
                    .or_default()
                    .push(format!("{} ({})", outcome.source.name, outcome.source.id));
            }
        }
        by_path
            .into_iter()
            .filter(|(_, sources)| sources.len() > 1)
            .map(|(path, sources)| (path.clone(), sources))
            .collect()
    }

    pub fn bytes_written(&self) -> u64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.artifact.as_ref())
            .map(|a| a.bytes_written)
            .sum()
    }
}
