use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::chunking::{Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::retrieval::DEFAULT_TOP_N;

const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 120;

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunker: Chunker,
    /// Number of chunks retrieved per question
    pub top_n: usize,
    /// Upper bound on a single embedding or generation call
    pub gateway_timeout: Duration,
}

impl Default for RagConfig {
    fn default() -> Self {
        RagConfig {
            chunker: Chunker::default(),
            top_n: DEFAULT_TOP_N,
            gateway_timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
        }
    }
}

impl RagConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let chunk_size = env_or("RAG_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        let overlap = env_or("RAG_CHUNK_OVERLAP", DEFAULT_OVERLAP)?;
        let chunker = Chunker::new(chunk_size, overlap)?;

        let top_n = env_or("RAG_TOP_N", DEFAULT_TOP_N)?;
        let timeout_secs = env_or("RAG_GATEWAY_TIMEOUT_SECS", DEFAULT_GATEWAY_TIMEOUT_SECS)?;

        Ok(RagConfig {
            chunker,
            top_n,
            gateway_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Read and parse an environment variable, falling back to `default` when unset
pub(crate) fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}
