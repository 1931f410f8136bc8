use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure of a call to an external embedding or generation model
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed: {status} {body}")]
    Api { status: u16, body: String },

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Model(String),
}

/// Errors raised by the ingestion and retrieval pipeline
#[derive(Debug, Error)]
pub enum RagError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported file type: {0:?}. Only txt, docx and pdf files are supported.")]
    UnsupportedType(String),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to extract text from {}: {message}", path.display())]
    Extraction { path: PathBuf, message: String },

    #[error("Invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap} (overlap must be smaller than a non-zero chunk size)")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding failed: {0}")]
    Embedding(#[source] GatewayError),

    #[error("Generation failed: {0}")]
    Generation(#[source] GatewayError),

    #[error("Another file is currently being processed")]
    IngestionInProgress,
}

pub type Result<T> = std::result::Result<T, RagError>;
