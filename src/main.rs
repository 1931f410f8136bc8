use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use log::info;
use std::io::{self, Write};
use std::sync::Arc;

use doc_rag::config::RagConfig;
use doc_rag::ollama::{OllamaClient, OllamaConfig};
use doc_rag::rag::RagEngine;
use doc_rag::repl::ReplCommand;

/// Document question answering over a local Ollama server
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Document to load before the prompt opens (txt, docx or pdf)
    #[arg(index = 1)]
    file_path: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    // Load configuration from environment
    let ollama_config = OllamaConfig::from_env().context("Invalid Ollama configuration")?;
    let rag_config = RagConfig::from_env().context("Invalid RAG configuration")?;
    info!(
        "Using embedding model {} and language model {} at {}",
        ollama_config.embedding_model, ollama_config.language_model, ollama_config.base_url
    );

    let ollama = Arc::new(OllamaClient::new(ollama_config).context("Failed to build HTTP client")?);
    let engine = RagEngine::new(ollama.clone(), ollama, rag_config);

    println!("RAG Document Chatbot");
    println!("Supports: TXT, DOCX, PDF files");

    if let Some(file_path) = args.file_path {
        upload(&engine, &file_path).await;
    }

    println!("\nCommands: 'upload <path>', 'clear', 'status', 'quit'");
    run_query_loop(&engine).await.context("Error in query loop")?;

    Ok(())
}

async fn upload(engine: &RagEngine, file_path: &str) {
    if engine.ingest(file_path).await {
        println!(
            "Document loaded successfully ({} chunks)",
            engine.corpus_size()
        );
    } else {
        println!("Failed to process document");
    }
}

async fn run_query_loop(engine: &RagEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut buffer = String::new();

    loop {
        print!("\nYou: ");
        stdout.flush()?;

        buffer.clear();
        if stdin.read_line(&mut buffer)? == 0 {
            break;
        }

        match ReplCommand::parse(&buffer) {
            ReplCommand::Empty => continue,
            ReplCommand::Quit => break,
            ReplCommand::Upload(path) => upload(engine, &path).await,
            ReplCommand::Clear => {
                engine.clear();
                println!("Documents cleared");
            }
            ReplCommand::Status => {
                let status = serde_json::json!({
                    "documents_loaded": engine.corpus_loaded(),
                    "chunks_count": engine.corpus_size(),
                    "ingestion": engine.status(),
                });
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
            ReplCommand::Question(question) => {
                let answer = engine.answer(&question).await;
                println!("\nChatbot: {}", answer.response);
                if !answer.sources.is_empty() {
                    println!("\nSources: {}", answer.sources.join(", "));
                    println!("Chunks used: {}", answer.chunks_used);
                }
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}
