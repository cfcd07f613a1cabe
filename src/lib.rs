//! # drive-extract
//!
//! Pulls files out of Google Drive and turns each supported one into a
//! plain-text artifact on local disk.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌────────────┐
//! │  Fetcher   │──▶│ Normalizer │──▶│ Extractors │──▶│   Writer   │
//! │ Drive REST │   │ bytes/text │   │ by MIME    │   │ <out>/...  │
//! └────────────┘   └────────────┘   └────────────┘   └────────────┘
//!        ▲                                                 │
//!        └──────────── ExtractionOrchestrator ─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GOOGLE_DRIVE_ACCESS_TOKEN=...
//! drive-extract formats            # supported content types
//! drive-extract run --dry-run      # what would be extracted
//! drive-extract run                # extract everything
//! drive-extract file 1AbC... 2dEf... # extract specific files
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`formats`] | MIME types, categories and fetch plans |
//! | [`error`] | Per-file error taxonomy |
//! | [`traits`] | Fetcher, lister and extractor traits plus the extractor registry |
//! | [`drive`] | Google Drive v3 client |
//! | [`normalize`] | Response body normalization |
//! | [`extract`] | Built-in format extractors |
//! | [`output`] | Artifact paths and writes |
//! | [`orchestrator`] | Per-file state machine and batch runs |
//! | [`progress`] | Progress reporting on stderr |
//! | [`run`] | CLI command implementations |

pub mod config;
pub mod drive;
pub mod error;
pub mod extract;
pub mod formats;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod run;
pub mod traits;

pub use error::{DecodeError, ExtractionError, FetchError, NormalizeError, WriteError};
pub use formats::Category;
pub use models::{ExtractionOutcome, FileReference, OutcomeStatus, RunReport};
pub use orchestrator::ExtractionOrchestrator;
pub use output::OutputWriter;
pub use traits::{ContentFetcher, Extractor, ExtractorRegistry, FileLister};
