//! Knowledge base ingestion and retrieval-augmented answers

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::config::config::{EmbeddingConfig, KnowledgeConfig};
use crate::error::{AppError, Result};
use crate::index::{EmbeddingModel, chunk_text, rank_by_similarity};
use crate::llm::{ChatMessage, ChatModel, ChatOptions};
use crate::models::{AgentOutput, KnowledgeChunk, KnowledgeSource, SourceType};
use crate::storage::factory::{Table, Tables};
use crate::storage::repository::{Filter, Repository};

/// Upper bound on chunks scanned per question
const MAX_SCANNED_CHUNKS: usize = 5_000;

const RAG_SYSTEM_PROMPT: &str = "Você é um assistente especialista no mercado farmacêutico brasileiro. \
Responda em português usando apenas o contexto fornecido. Se o contexto não contiver a resposta, \
diga isso claramente.";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IngestRequest {
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[validate(length(min = 1))]
    pub text: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub source_id: String,
    pub chunks: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RagRequest {
    #[validate(length(min = 1, max = 4000))]
    pub question: String,
    #[serde(default)]
    #[validate(range(min = 1, max = 50))]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub source_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagSource {
    pub source_id: String,
    pub chunk_index: usize,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    pub output: String,
    pub output_id: String,
    pub sources: Vec<RagSource>,
}

pub struct KnowledgeService {
    sources: Table<KnowledgeSource>,
    chunks: Table<KnowledgeChunk>,
    outputs: Table<AgentOutput>,
    embedder: Arc<dyn EmbeddingModel>,
    chat: Arc<dyn ChatModel>,
    max_chunk_chars: usize,
    default_top_k: usize,
    batch_size: usize,
}

impl KnowledgeService {
    pub fn new(
        tables: &Tables,
        embedder: Arc<dyn EmbeddingModel>,
        chat: Arc<dyn ChatModel>,
        knowledge: &KnowledgeConfig,
        embedding: &EmbeddingConfig,
    ) -> Self {
        Self {
            sources: tables.knowledge_sources.clone(),
            chunks: tables.knowledge_chunks.clone(),
            outputs: tables.agent_outputs.clone(),
            embedder,
            chat,
            max_chunk_chars: knowledge.max_chunk_chars,
            default_top_k: knowledge.default_top_k,
            batch_size: embedding.batch_size.max(1),
        }
    }

    /// Split, embed and store a document
    #[instrument(skip(self, request), fields(user_id = %user_id, title = %request.title))]
    pub async fn ingest(&self, user_id: &str, request: IngestRequest) -> Result<IngestResponse> {
        request.validate()?;

        let pieces = chunk_text(&request.text, self.max_chunk_chars);
        if pieces.is_empty() {
            return Err(AppError::Validation("text has no content to ingest".into()));
        }

        let mut embeddings = Vec::with_capacity(pieces.len());
        for batch in pieces.chunks(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(String::as_str).collect();
            embeddings.extend(self.embedder.encode_batch(&texts).await?);
        }
        if embeddings.len() != pieces.len() {
            return Err(AppError::Embedding(format!(
                "expected {} embeddings, got {}",
                pieces.len(),
                embeddings.len()
            )));
        }
        let dimension = self.embedder.dimension();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != dimension) {
            return Err(AppError::Embedding(format!(
                "expected {}-dimensional embeddings, got {}",
                dimension,
                bad.len()
            )));
        }

        let mut source = KnowledgeSource::new(user_id, &request.title, request.source_type, request.url);
        self.sources.create(&source).await?;

        source.chunk_count = pieces.len();
        for (index, (content, embedding)) in pieces.into_iter().zip(embeddings).enumerate() {
            self.chunks
                .create(&KnowledgeChunk::new(&source, index, content, embedding))
                .await?;
        }

        self.sources.update(&source.id, &source).await?;

        info!(source_id = %source.id, chunks = source.chunk_count, "knowledge source ingested");
        Ok(IngestResponse {
            source_id: source.id,
            chunks: source.chunk_count,
        })
    }

    /// Answer a question from the caller's own chunks
    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn ask(&self, user_id: &str, request: RagRequest) -> Result<RagResponse> {
        request.validate()?;
        let top_k = request.top_k.unwrap_or(self.default_top_k).max(1);

        let mut filter = Filter::new().owned_by::<KnowledgeChunk>(user_id);
        if let Some(source_id) = &request.source_id {
            filter = filter.eq("source_id", source_id.as_str());
        }
        let candidates = self.chunks.list(&filter, MAX_SCANNED_CHUNKS, 0).await?;
        if candidates.len() == MAX_SCANNED_CHUNKS {
            warn!(limit = MAX_SCANNED_CHUNKS, "chunk scan limit reached, older chunks are not ranked");
        }

        let query = self.embedder.encode(&request.question).await?;
        let ranked = rank_by_similarity(&query, candidates, |c| c.embedding.as_slice(), top_k);

        let context = if ranked.is_empty() {
            "Nenhum documento relevante foi encontrado na base de conhecimento.".to_string()
        } else {
            ranked
                .iter()
                .enumerate()
                .map(|(i, scored)| format!("[{}] {}", i + 1, scored.item.content))
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let messages = [
            ChatMessage::system(RAG_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Contexto:\n{}\n\nPergunta: {}",
                context, request.question
            )),
        ];
        let output = self.chat.complete(&messages, &ChatOptions::default()).await?;

        let sources: Vec<RagSource> = ranked
            .iter()
            .map(|scored| RagSource {
                source_id: scored.item.source_id.clone(),
                chunk_index: scored.item.chunk_index,
                score: scored.score,
            })
            .collect();

        let stored = self
            .outputs
            .create(
                &AgentOutput::completed(
                    user_id,
                    "knowledge",
                    json!({"question": request.question, "top_k": top_k, "source_id": request.source_id}),
                    &output,
                )
                .with_metadata(json!({"sources": sources, "model": self.chat.model()})),
            )
            .await?;

        Ok(RagResponse {
            output,
            output_id: stored.id,
            sources,
        })
    }

    /// Remove a source and its chunks; `NotFound` for other users' sources
    pub async fn delete_source(&self, user_id: &str, source_id: &str) -> Result<usize> {
        self.sources
            .get_by_id(source_id)
            .await?
            .filter(|s| s.owner_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("knowledge source {}", source_id)))?;

        let removed = self
            .chunks
            .purge(&Filter::new().eq("source_id", source_id))
            .await?;
        self.sources.delete(source_id).await?;

        info!(source_id, chunks = removed, "knowledge source deleted");
        Ok(removed as usize)
    }
}
