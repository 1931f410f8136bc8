pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod docx;
pub mod embeddings;
pub mod error;
pub mod ollama;
pub mod rag;
pub mod repl;
pub mod retrieval;
pub mod vector_store;

pub use error::{GatewayError, RagError};
pub use rag::{Answer, IngestReport, IngestStatus, RagEngine};
