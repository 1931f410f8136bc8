use log::{error, info, warn};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;

use crate::config::RagConfig;
use crate::context::build_prompt;
use crate::document::Document;
use crate::embeddings::{with_timeout, EmbeddingGateway, GenerationGateway};
use crate::error::{RagError, Result};
use crate::retrieval::Retriever;
use crate::vector_store::{ChunkRecord, VectorStore};

pub const NO_DOCUMENTS_REPLY: &str =
    "No documents have been uploaded yet. Please upload a document first.";
pub const NO_RELEVANT_INFORMATION_REPLY: &str =
    "I couldn't find any relevant information in the uploaded documents.";

/// Reply to a question, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub response: String,
    /// Distinct source files of the retrieved chunks, in retrieval order
    pub sources: Vec<String>,
    /// Number of chunks retrieved (not de-duplicated)
    pub chunks_used: usize,
}

impl Answer {
    fn without_context(response: &str) -> Self {
        Answer {
            response: response.to_string(),
            sources: Vec::new(),
            chunks_used: 0,
        }
    }
}

/// A chunk left out of the corpus during ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedChunk {
    pub index: usize,
    pub reason: String,
}

/// What happened to one chunk during ingestion
#[derive(Debug)]
pub enum ChunkOutcome {
    Embedded(ChunkRecord),
    Skipped(SkippedChunk),
}

/// Summary of one document ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub source: String,
    pub total_chunks: usize,
    pub stored: usize,
    pub skipped: Vec<SkippedChunk>,
}

impl IngestReport {
    fn from_outcomes(source: String, outcomes: Vec<ChunkOutcome>) -> (Self, Vec<ChunkRecord>) {
        let total_chunks = outcomes.len();
        let mut records = Vec::with_capacity(total_chunks);
        let mut skipped = Vec::new();

        for outcome in outcomes {
            match outcome {
                ChunkOutcome::Embedded(record) => records.push(record),
                ChunkOutcome::Skipped(chunk) => skipped.push(chunk),
            }
        }

        let report = IngestReport {
            source,
            total_chunks,
            stored: records.len(),
            skipped,
        };
        (report, records)
    }
}

/// Progress of the current (or last) ingestion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IngestStatus {
    pub is_processing: bool,
    /// Percentage, 0 to 100
    pub progress: u8,
    pub message: String,
    pub current_file: Option<String>,
}

/// Held while an ingestion runs; releases the busy flag on drop
struct IngestGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for IngestGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// RAG (Retrieval-Augmented Generation) engine
pub struct RagEngine {
    store: Arc<VectorStore>,
    embedder: Arc<dyn EmbeddingGateway>,
    generator: Arc<dyn GenerationGateway>,
    retriever: Retriever,
    config: RagConfig,
    busy: Arc<AtomicBool>,
    status: Mutex<IngestStatus>,
}

impl RagEngine {
    /// Create a new RAG engine with an empty corpus
    pub fn new(
        embedder: Arc<dyn EmbeddingGateway>,
        generator: Arc<dyn GenerationGateway>,
        config: RagConfig,
    ) -> Self {
        let store = Arc::new(VectorStore::new());
        let retriever = Retriever::new(
            Arc::clone(&embedder),
            Arc::clone(&store),
            config.gateway_timeout,
        );

        RagEngine {
            store,
            embedder,
            generator,
            retriever,
            config,
            busy: Arc::new(AtomicBool::new(false)),
            status: Mutex::new(IngestStatus::default()),
        }
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    pub fn corpus_size(&self) -> usize {
        self.store.size()
    }

    pub fn corpus_loaded(&self) -> bool {
        self.corpus_size() > 0
    }

    pub fn clear(&self) {
        self.store.clear();
        info!("Corpus cleared");
    }

    pub fn status(&self) -> IngestStatus {
        self.lock_status().clone()
    }

    /// Ingest a document, replacing the current corpus.
    ///
    /// Returns `false` if the document could not be loaded or another
    /// ingestion is running; chunks that fail to embed do not count as failure.
    pub async fn ingest<P: AsRef<Path>>(&self, path: P) -> bool {
        let path = path.as_ref();
        match self.ingest_document(path).await {
            Ok(_) => true,
            Err(e) => {
                error!("Error processing file {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Ingest a document and report per-chunk outcomes
    pub async fn ingest_document<P: AsRef<Path>>(&self, path: P) -> Result<IngestReport> {
        let guard = self.begin_ingest(path.as_ref())?;
        self.run_ingest(path.as_ref(), guard).await
    }

    /// Start an ingestion on a background task.
    ///
    /// Fails immediately with `IngestionInProgress` if one is already running.
    pub fn spawn_ingest(self: &Arc<Self>, path: impl AsRef<Path>) -> Result<JoinHandle<bool>> {
        let path = path.as_ref().to_path_buf();
        // Claim the flag here so a second request is rejected before the task runs.
        // The guard moves into the task and is dropped with it even if never polled.
        let guard = self.begin_ingest(&path)?;

        let engine = Arc::clone(self);
        Ok(tokio::spawn(async move {
            match engine.run_ingest(&path, guard).await {
                Ok(_) => true,
                Err(e) => {
                    error!("Error processing file {}: {}", path.display(), e);
                    false
                }
            }
        }))
    }

    /// Answer a question from the current corpus. Never fails.
    pub async fn answer(&self, question: &str) -> Answer {
        if self.store.is_empty() {
            return Answer::without_context(NO_DOCUMENTS_REPLY);
        }

        let chunks = self.retriever.retrieve(question, self.config.top_n).await;
        if chunks.is_empty() {
            return Answer::without_context(NO_RELEVANT_INFORMATION_REPLY);
        }

        let prompt = build_prompt(question, &chunks);
        let response = match with_timeout(
            self.config.gateway_timeout,
            self.generator.generate(&prompt),
        )
        .await
        {
            Ok(text) => text,
            Err(e) => {
                let response = format!("Error generating response: {}", e);
                error!("{}", RagError::Generation(e));
                response
            }
        };

        let mut sources: Vec<String> = Vec::new();
        for chunk in &chunks {
            if !sources.contains(&chunk.source) {
                sources.push(chunk.source.clone());
            }
        }

        Answer {
            response,
            sources,
            chunks_used: chunks.len(),
        }
    }

    fn claim(&self) -> Result<()> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| RagError::IngestionInProgress)
    }

    fn begin_ingest(&self, path: &Path) -> Result<IngestGuard> {
        self.claim()?;
        self.mark_started(path);
        Ok(IngestGuard {
            busy: Arc::clone(&self.busy),
        })
    }

    fn mark_started(&self, path: &Path) {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        *self.lock_status() = IngestStatus {
            is_processing: true,
            progress: 0,
            message: "Reading file...".to_string(),
            current_file: file_name,
        };
    }

    async fn run_ingest(&self, path: &Path, _guard: IngestGuard) -> Result<IngestReport> {
        info!("Processing file: {}", path.display());

        let result = self.load_and_embed(path).await;
        let mut status = self.lock_status();
        *status = match &result {
            Ok(_) => IngestStatus {
                is_processing: false,
                progress: 100,
                message: "File processed successfully!".to_string(),
                current_file: None,
            },
            Err(e) => IngestStatus {
                is_processing: false,
                progress: 0,
                message: format!("Failed to process file: {}", e),
                current_file: None,
            },
        };
        result
    }

    async fn load_and_embed(&self, path: &Path) -> Result<IngestReport> {
        let document = Document::from_file(path)?;
        let chunks = document.chunks(&self.config.chunker);
        let total = chunks.len();
        info!("Document split into {} chunks", total);

        let mut outcomes = Vec::with_capacity(total);
        let mut dimension: Option<usize> = None;

        for (index, chunk) in chunks.into_iter().enumerate() {
            let outcome = self
                .embed_chunk(index, chunk, &document.document_id, &mut dimension)
                .await;
            if let ChunkOutcome::Skipped(skipped) = &outcome {
                warn!("Skipping chunk {}: {}", skipped.index, skipped.reason);
            }
            outcomes.push(outcome);

            let done = index + 1;
            if done % 10 == 0 || done == total {
                info!("Processed {}/{} chunks", done, total);
            }
            self.lock_status().progress = (done * 100 / total) as u8;
        }

        let (report, records) = IngestReport::from_outcomes(document.document_id, outcomes);
        self.store.replace_all(records)?;

        info!(
            "Successfully processed {} of {} chunks from {}",
            report.stored,
            report.total_chunks,
            path.display()
        );
        Ok(report)
    }

    async fn embed_chunk(
        &self,
        index: usize,
        text: String,
        source: &str,
        dimension: &mut Option<usize>,
    ) -> ChunkOutcome {
        let embedding =
            match with_timeout(self.config.gateway_timeout, self.embedder.embed(&text)).await {
                Ok(embedding) => embedding,
                Err(e) => {
                    return ChunkOutcome::Skipped(SkippedChunk {
                        index,
                        reason: RagError::Embedding(e).to_string(),
                    })
                }
            };

        let expected = *dimension.get_or_insert(embedding.dimension());
        if embedding.dimension() != expected {
            let mismatch = RagError::DimensionMismatch {
                expected,
                actual: embedding.dimension(),
            };
            return ChunkOutcome::Skipped(SkippedChunk {
                index,
                reason: mismatch.to_string(),
            });
        }

        ChunkOutcome::Embedded(ChunkRecord::new(text, embedding, source))
    }

    fn lock_status(&self) -> MutexGuard<'_, IngestStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }
}
