use crate::vector_store::ScoredChunk;

/// Sentence the model is asked to use when the context does not cover the question
pub const INSUFFICIENT_CONTEXT_REPLY: &str =
    "I don't have enough information to answer that question based on the provided documents.";

/// Render retrieved chunks as a bulleted context block
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| format!("- {}", chunk.text))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Create the grounded question-answering prompt
pub fn build_prompt(question: &str, chunks: &[ScoredChunk]) -> String {
    format!(
        "You are a helpful AI assistant. Answer the question based only on the following context information:\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Instructions:\n\
         - Answer based only on the provided context\n\
         - If the context doesn't contain relevant information, say \"{insufficient}\"\n\
         - Be concise and accurate\n\
         - Answer in the same language as the question\n\
         \n\
         Answer:",
        context = build_context(chunks),
        question = question,
        insufficient = INSUFFICIENT_CONTEXT_REPLY,
    )
}
