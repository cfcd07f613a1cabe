//! Per-file error taxonomy.
//!
//! None of these abort a batch: the orchestrator records them on the file's
//! [`ExtractionOutcome`](crate::models::ExtractionOutcome) and moves on.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::Stage;

/// Any failure that ends processing of a single file.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("unsupported content-type: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl ExtractionError {
    /// Stage the error belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            ExtractionError::UnsupportedFormat(_) => Stage::Classifying,
            ExtractionError::Fetch(_) => Stage::Fetching,
            ExtractionError::Normalize(_) => Stage::Normalizing,
            ExtractionError::Decode(_) => Stage::Extracting,
            ExtractionError::Write(_) => Stage::Writing,
        }
    }
}

/// Network, auth, or API failure talking to the remote store.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request for {file_id} failed: {source}")]
    Transport {
        file_id: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} for {file_id} returned HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        file_id: String,
        status: u16,
        body: String,
    },

    #[error("unexpected response for {file_id}: {message}")]
    InvalidResponse { file_id: String, message: String },
}

/// The response body could not be collapsed into canonical bytes.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("reading response stream failed: {0}")]
    Stream(#[from] std::io::Error),

    #[error("payload exceeds size limit ({limit} bytes)")]
    TooLarge { limit: u64 },

    #[error("serializing structured payload failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Malformed or unparseable payload for the selected extractor.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("{extractor} expects {expected} input")]
    WrongShape {
        extractor: &'static str,
        expected: &'static str,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("word document extraction failed: {0}")]
    Word(String),

    #[error("extraction did not complete: {0}")]
    Interrupted(String),

    #[error("{source} (payload was normalized through the lossy fallback)")]
    Lossy {
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Mark an error raised while decoding content that went through the
    /// lossy normalization fallback.
    pub fn lossy(self) -> Self {
        match self {
            DecodeError::Lossy { .. } => self,
            other => DecodeError::Lossy {
                source: Box::new(other),
            },
        }
    }
}

/// Filesystem failure while persisting an artifact.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("creating directory {path} failed: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("writing {path} failed: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
