use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::config::env_or;
use crate::embeddings::{Embedding, EmbeddingGateway, GenerationGateway};
use crate::error::GatewayError;

const DEFAULT_URL: &str = "http://localhost:11434";
const DEFAULT_EMBEDDING_MODEL: &str = "nomic-embed-text";
const DEFAULT_LANGUAGE_MODEL: &str = "llama3";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Configuration for an Ollama server
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub embedding_model: String,
    pub language_model: String,
    pub timeout: Duration,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        OllamaConfig {
            base_url: DEFAULT_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            language_model: DEFAULT_LANGUAGE_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OllamaConfig {
    /// Create a new configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let base_url = env::var("OLLAMA_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
        let embedding_model =
            env::var("EMBEDDING_MODEL").unwrap_or_else(|_| DEFAULT_EMBEDDING_MODEL.to_string());
        let language_model =
            env::var("LANGUAGE_MODEL").unwrap_or_else(|_| DEFAULT_LANGUAGE_MODEL.to_string());
        let timeout_secs = env_or("OLLAMA_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;

        Ok(OllamaConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_model,
            language_model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Client for the Ollama embedding and generation endpoints
#[derive(Clone)]
pub struct OllamaClient {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(OllamaClient { config, client })
    }

    /// Get the client configuration
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Generate an embedding for a text
    pub async fn get_embedding(&self, text: &str) -> Result<Embedding, GatewayError> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            prompt: text,
        };

        let url = format!("{}/api/embeddings", self.config.base_url);
        let response: EmbeddingResponse = self.post_json(&url, &request).await?;

        if response.embedding.is_empty() {
            return Err(GatewayError::Model("No embedding returned".to_string()));
        }

        Ok(Embedding::new(response.embedding))
    }

    /// Generate text with the configured language model
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GatewayError> {
        let request = GenerateRequest {
            model: &self.config.language_model,
            prompt,
            stream: false,
        };

        let url = format!("{}/api/generate", self.config.base_url);
        let response: GenerateResponse = self.post_json(&url, &request).await?;

        Ok(response.response)
    }

    async fn post_json<Req, Resp>(&self, url: &str, request: &Req) -> Result<Resp, GatewayError>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body: error_text,
            });
        }

        response.json().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, error: reqwest::Error) -> GatewayError {
        if error.is_timeout() {
            GatewayError::Timeout(self.config.timeout)
        } else {
            GatewayError::Transport(error)
        }
    }
}

#[async_trait]
impl EmbeddingGateway for OllamaClient {
    async fn embed(&self, text: &str) -> Result<Embedding, GatewayError> {
        self.get_embedding(text).await
    }
}

#[async_trait]
impl GenerationGateway for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        self.generate_text(prompt).await
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    response: String,
}
