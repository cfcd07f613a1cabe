//! Per-file state machine and batch scheduling.
//!
//! Each file moves through
//!
//! ```text
//! Pending → Classified → Skipped
//!                      → Fetching → Normalizing → Extracting → Writing → Done
//!                                                                      ↘ Failed(stage)
//! ```
//!
//! A batch spawns one task per file on a [`JoinSet`], bounded by a
//! [`Semaphore`], and drains the set before returning. A file that fails or
//! panics produces a `Failed` outcome; the rest of the batch keeps going.
//!
//! Cancelling the token aborts every task still running. Artifacts already on
//! disk are left in place and the report is marked `cancelled`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{DecodeError, ExtractionError};
use crate::formats::Category;
use crate::models::{
    ExtractionOutcome, FileReference, NormalizedContent, OutputArtifact, RunReport, Stage,
};
use crate::normalize::{into_content, normalize};
use crate::output::OutputWriter;
use crate::progress::{NoProgress, ProgressEvent, ProgressReporter};
use crate::traits::{ContentFetcher, Extractor, ExtractorRegistry};

const DEFAULT_CONCURRENCY: usize = 4;

/// Drives files from the remote store to text artifacts on disk.
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    fetcher: Arc<dyn ContentFetcher>,
    registry: Arc<ExtractorRegistry>,
    writer: OutputWriter,
    concurrency: usize,
    max_bytes: Option<u64>,
    progress: Arc<dyn ProgressReporter>,
}

impl ExtractionOrchestrator {
    /// Orchestrator with the built-in extractors and default limits.
    pub fn new(fetcher: Arc<dyn ContentFetcher>, writer: OutputWriter) -> Self {
        Self {
            fetcher,
            registry: Arc::new(ExtractorRegistry::with_builtins()),
            writer,
            concurrency: DEFAULT_CONCURRENCY,
            max_bytes: None,
            progress: Arc::new(NoProgress),
        }
    }

    /// Orchestrator configured from `[output]` and `[extraction]`.
    pub fn from_config(fetcher: Arc<dyn ContentFetcher>, config: &Config) -> Self {
        Self::new(fetcher, OutputWriter::new(&config.output.dir))
            .with_concurrency(config.extraction.concurrency)
            .with_max_bytes(config.extraction.max_bytes)
    }

    pub fn with_registry(mut self, registry: ExtractorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Maximum files in flight. Values below 1 are raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Run one file to a terminal state. Never returns an error: failures
    /// are recorded on the outcome.
    pub async fn process_file(&self, file: &FileReference) -> ExtractionOutcome {
        let Some(extractor) = self.registry.get_for_mime(&file.mime_type) else {
            let reason = ExtractionError::UnsupportedFormat(file.mime_type.clone());
            warn!(file = %file.name, id = %file.id, "skipped: {}", reason);
            return ExtractionOutcome::skipped(file.clone(), reason.to_string());
        };

        let category = extractor.category();
        debug!(file = %file.name, id = %file.id, %category, extractor = extractor.name(), "classified");

        match self.extract_to_disk(file, extractor).await {
            Ok(artifact) => {
                info!(
                    file = %file.name,
                    path = %artifact.path.display(),
                    bytes = artifact.bytes_written,
                    "wrote artifact"
                );
                ExtractionOutcome::success(file.clone(), category, artifact)
            }
            Err(err) => {
                let stage = err.stage();
                warn!(file = %file.name, id = %file.id, %stage, "failed: {}", err);
                ExtractionOutcome::failed(file.clone(), Some(category), stage, &err)
            }
        }
    }

    async fn extract_to_disk(
        &self,
        file: &FileReference,
        extractor: Arc<dyn Extractor>,
    ) -> Result<OutputArtifact, ExtractionError> {
        let fetched = self.fetcher.fetch_content(&file.id, &file.mime_type).await?;
        let encoding = fetched.encoding;

        let normalized = normalize(fetched.body, self.max_bytes).await?;
        let lossy = normalized.lossy;
        let content = into_content(normalized, encoding);
        debug!(file = %file.name, encoding = encoding.as_str(), bytes = content.len(), "normalized");

        let category = extractor.category();
        let text = decode_blocking(extractor, content)
            .await
            .map_err(|e| if lossy { e.lossy() } else { e })?;

        let artifact = self.writer.write(&text, &file.name, category).await?;
        Ok(artifact)
    }

    /// Look a file up by id, then process it.
    ///
    /// A failed metadata lookup yields a `Failed` outcome at the fetch stage
    /// whose source carries the id as its name.
    pub async fn process_by_id(&self, file_id: &str) -> ExtractionOutcome {
        match self.fetcher.fetch_metadata(file_id).await {
            Ok(file) => self.process_file(&file).await,
            Err(err) => {
                warn!(id = %file_id, "metadata lookup failed: {}", err);
                let source = FileReference {
                    id: file_id.to_string(),
                    name: file_id.to_string(),
                    mime_type: String::new(),
                };
                ExtractionOutcome::failed(source, None, Stage::Fetching, &err)
            }
        }
    }

    /// Process every file and wait for all of them to settle.
    ///
    /// Outcomes in the report are sorted by file name, then id.
    pub async fn run_batch(
        &self,
        files: Vec<FileReference>,
        cancel: CancellationToken,
    ) -> RunReport {
        let started_at = Utc::now();
        let planned = files.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<ExtractionOutcome> = JoinSet::new();

        for file in files {
            let this = self.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(err) => return not_started(file, err),
                };
                let result = AssertUnwindSafe(this.process_file(&file)).catch_unwind().await;
                match result {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!(file = %file.name, id = %file.id, "extraction task panicked");
                        let category = Category::from_mime(&file.mime_type);
                        ExtractionOutcome::failed(file, category, Stage::Extracting, "task panicked")
                    }
                }
            });
        }

        let mut outcomes = Vec::with_capacity(planned);
        let mut cancelled = false;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled(), if !cancelled => {
                    warn!(in_flight = tasks.len(), "run cancelled, abandoning in-flight files");
                    cancelled = true;
                    tasks.abort_all();
                }
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok(outcome)) => {
                        outcomes.push(outcome);
                        self.progress.report(ProgressEvent::Processed {
                            n: outcomes.len() as u64,
                            total: planned as u64,
                        });
                    }
                    Some(Err(err)) if err.is_cancelled() => {}
                    Some(Err(err)) => error!("extraction task failed: {}", err),
                },
            }
        }

        outcomes.sort_by(|a, b| {
            a.source
                .name
                .cmp(&b.source.name)
                .then_with(|| a.source.id.cmp(&b.source.id))
        });

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            cancelled,
            planned,
            outcomes,
        };
        for (path, sources) in report.shared_artifacts() {
            warn!(
                path = %path.display(),
                files = %sources.join(", "),
                "several files wrote the same artifact, only the last one is kept"
            );
        }
        report
    }
}

/// Run a decoder on the blocking pool so large documents do not stall the
/// runtime and an aborted task stops waiting for them.
async fn decode_blocking(
    extractor: Arc<dyn Extractor>,
    content: NormalizedContent,
) -> Result<String, DecodeError> {
    match tokio::task::spawn_blocking(move || extractor.extract(content)).await {
        Ok(result) => result,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => Err(DecodeError::Interrupted(err.to_string())),
    }
}

/// Outcome for a file whose task never got a concurrency slot. Nothing was
/// requested from the remote store yet, so it fails at the fetch stage.
fn not_started(file: FileReference, err: AcquireError) -> ExtractionOutcome {
    let category = Category::from_mime(&file.mime_type);
    ExtractionOutcome::failed(file, category, Stage::Fetching, err)
}
