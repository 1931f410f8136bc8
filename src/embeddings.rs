use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::GatewayError;

/// Representation of a vector embedding
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Embedding { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Maps text to a fixed-dimension vector using an external model
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding, GatewayError>;
}

/// Turns a prompt into a natural-language answer using an external model
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;
}

/// Run a gateway call, failing with `GatewayError::Timeout` once `limit` elapses
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, GatewayError>
where
    F: Future<Output = Result<T, GatewayError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| GatewayError::Timeout(limit))?
}

#[cfg(test)]
pub(crate) mod testing {
    //! Deterministic gateways for pipeline tests.

    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Semaphore;

    const DIMENSIONS: usize = 1024;

    /// Bag-of-words embedder: each lowercase word bumps one hashed bucket
    pub struct WordHashEmbedder {
        pub calls: AtomicUsize,
    }

    impl WordHashEmbedder {
        pub fn new() -> Self {
            WordHashEmbedder {
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    pub fn word_hash_embedding(text: &str) -> Embedding {
        let mut values = vec![0.0f32; DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            word.to_lowercase().hash(&mut hasher);
            values[(hasher.finish() as usize) % DIMENSIONS] += 1.0;
        }
        Embedding::new(values)
    }

    #[async_trait]
    impl EmbeddingGateway for WordHashEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(word_hash_embedding(text))
        }
    }

    /// Fails for any text containing the marker, embeds everything else
    pub struct FailingEmbedder {
        pub marker: &'static str,
    }

    #[async_trait]
    impl EmbeddingGateway for FailingEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding, GatewayError> {
            if text.contains(self.marker) {
                return Err(GatewayError::Model("embedding model unavailable".into()));
            }
            Ok(word_hash_embedding(text))
        }
    }

    /// Never answers
    pub struct HangingEmbedder;

    #[async_trait]
    impl EmbeddingGateway for HangingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Embedding, GatewayError> {
            std::future::pending().await
        }
    }

    /// Hangs for any text containing the marker, embeds everything else
    pub struct StallingEmbedder {
        pub marker: &'static str,
    }

    #[async_trait]
    impl EmbeddingGateway for StallingEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding, GatewayError> {
            if text.contains(self.marker) {
                std::future::pending::<()>().await;
            }
            Ok(word_hash_embedding(text))
        }
    }

    /// Waits for a permit before every call
    pub struct GatedEmbedder {
        pub gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl EmbeddingGateway for GatedEmbedder {
        async fn embed(&self, text: &str) -> Result<Embedding, GatewayError> {
            let _permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| GatewayError::Model(e.to_string()))?;
            Ok(word_hash_embedding(text))
        }
    }

    /// Records every prompt and replies with a canned answer
    pub struct RecordingGenerator {
        pub reply: Result<String, String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl RecordingGenerator {
        pub fn answering(reply: &str) -> Self {
            RecordingGenerator {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            RecordingGenerator {
                reply: Err(message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerationGateway for RecordingGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(GatewayError::Model)
        }
    }

    /// Never answers
    pub struct HangingGenerator;

    #[async_trait]
    impl GenerationGateway for HangingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GatewayError> {
            std::future::pending().await
        }
    }
}
