//! Extension traits for listing, fetching, and extracting.
//!
//! The pipeline talks to the remote store and to format decoders only
//! through these traits, so each side can be swapped independently (the
//! Drive client in production, in-memory fakes in tests, extra decoders
//! registered by embedding binaries).
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌──────────────────────────┐
//! │ FileLister │──▶│ContentFetcher│──▶│    ExtractorRegistry     │
//! │  (Drive)   │   │   (Drive)    │   │ pdf/doc/sheet/slides/... │
//! └────────────┘   └──────────────┘   └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use drive_extract::traits::ExtractorRegistry;
//!
//! let registry = ExtractorRegistry::with_builtins();
//! assert!(registry.get_for_mime("application/pdf").is_some());
//! assert!(registry.get_for_mime("image/png").is_none());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::{DecodeError, FetchError};
use crate::extract::{
    DocumentExtractor, PdfExtractor, PlainTextExtractor, PresentationExtractor,
    SpreadsheetExtractor, WordExtractor,
};
use crate::formats::Category;
use crate::models::{FetchResult, FileReference, NormalizedContent};

// ═══════════════════════════════════════════════════════════════════════
// Remote store
// ═══════════════════════════════════════════════════════════════════════

/// Enumerates files in the remote store.
///
/// Pagination and credential handling are the implementation's concern;
/// callers receive the complete listing.
#[async_trait]
pub trait FileLister: Send + Sync {
    /// Returns every file visible to the authenticated account.
    async fn list_files(&self) -> Result<Vec<FileReference>>;
}

/// Retrieves metadata and content for a single file.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use bytes::Bytes;
/// use drive_extract::error::FetchError;
/// use drive_extract::models::{FetchResult, FileReference, ResponseBody, ResponseEncoding};
/// use drive_extract::traits::ContentFetcher;
///
/// pub struct FixedFetcher;
///
/// #[async_trait]
/// impl ContentFetcher for FixedFetcher {
///     async fn fetch_metadata(&self, file_id: &str) -> Result<FileReference, FetchError> {
///         Ok(FileReference {
///             id: file_id.to_string(),
///             name: "notes.txt".to_string(),
///             mime_type: "text/plain".to_string(),
///         })
///     }
///
///     async fn fetch_content(&self, _id: &str, _mime: &str) -> Result<FetchResult, FetchError> {
///         Ok(FetchResult {
///             encoding: ResponseEncoding::MediaText,
///             body: ResponseBody::Binary(Bytes::from_static(b"hello")),
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Looks up a file's name and declared content type.
    async fn fetch_metadata(&self, file_id: &str) -> Result<FileReference, FetchError>;

    /// Downloads or exports a file's content.
    ///
    /// Only called with MIME types that have a registered extractor.
    async fn fetch_content(&self, file_id: &str, mime_type: &str)
        -> Result<FetchResult, FetchError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Extractor Trait
// ═══════════════════════════════════════════════════════════════════════

/// Turns normalized content of one format into plain text.
///
/// Extraction is synchronous: by the time an extractor runs, all I/O for
/// the file is complete.
pub trait Extractor: Send + Sync {
    /// Short identifier used in diagnostics (e.g. `"pdf"`).
    fn name(&self) -> &'static str;

    /// Output bucket for text produced by this extractor.
    fn category(&self) -> Category;

    /// Declared MIME types this extractor handles.
    fn supported_types(&self) -> &[&'static str];

    /// Decode `content` into plain text.
    fn extract(&self, content: NormalizedContent) -> Result<String, DecodeError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// MIME type to extractor mapping.
///
/// Use [`ExtractorRegistry::with_builtins`] for the six standard formats,
/// then optionally call [`register`](ExtractorRegistry::register) to add or
/// replace handlers. A later registration for the same MIME type wins, so
/// every type resolves to exactly one extractor.
pub struct ExtractorRegistry {
    by_mime: HashMap<String, Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            by_mime: HashMap::new(),
        }
    }

    /// Create a registry pre-loaded with the built-in extractors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PdfExtractor));
        registry.register(Arc::new(DocumentExtractor));
        registry.register(Arc::new(SpreadsheetExtractor));
        registry.register(Arc::new(PresentationExtractor));
        registry.register(Arc::new(WordExtractor));
        registry.register(Arc::new(PlainTextExtractor));
        registry
    }

    /// Register an extractor for every MIME type it supports.
    pub fn register(&mut self, extractor: Arc<dyn Extractor>) {
        for mime in extractor.supported_types() {
            self.by_mime
                .insert((*mime).to_string(), Arc::clone(&extractor));
        }
    }

    /// Find the extractor for a declared MIME type.
    pub fn get_for_mime(&self, mime_type: &str) -> Option<Arc<dyn Extractor>> {
        self.by_mime.get(mime_type).cloned()
    }

    /// Whether a MIME type belongs to the supported set.
    pub fn supports(&self, mime_type: &str) -> bool {
        self.by_mime.contains_key(mime_type)
    }

    /// Registered MIME types, sorted.
    pub fn mime_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.by_mime.keys().map(|k| k.as_str()).collect();
        types.sort_unstable();
        types
    }

    pub fn is_empty(&self) -> bool {
        self.by_mime.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_mime.len()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
