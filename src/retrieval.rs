use log::{debug, error};
use std::sync::Arc;
use std::time::Duration;

use crate::embeddings::{with_timeout, EmbeddingGateway};
use crate::vector_store::{ScoredChunk, VectorStore};

/// Default number of chunks handed to the generation model
pub const DEFAULT_TOP_N: usize = 5;

/// Embeds queries and ranks the stored chunks against them
pub struct Retriever {
    embedder: Arc<dyn EmbeddingGateway>,
    store: Arc<VectorStore>,
    timeout: Duration,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingGateway>,
        store: Arc<VectorStore>,
        timeout: Duration,
    ) -> Self {
        Retriever {
            embedder,
            store,
            timeout,
        }
    }

    /// Return the `top_n` chunks most similar to the query.
    ///
    /// An embedding failure is logged and yields no results.
    pub async fn retrieve(&self, query: &str, top_n: usize) -> Vec<ScoredChunk> {
        let query_embedding = match with_timeout(self.timeout, self.embedder.embed(query)).await {
            Ok(embedding) => embedding,
            Err(e) => {
                error!("Error during retrieval: {}", e);
                return Vec::new();
            }
        };

        let results = self.store.search(&query_embedding, top_n);
        debug!("Retrieved {} chunks for query", results.len());
        results
    }
}
