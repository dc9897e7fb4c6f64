//! Knowledge base sources and chunks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::storage::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[default]
    Text,
    Url,
    Document,
}

/// An ingested document
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct KnowledgeSource {
    pub id: String,
    pub owner_id: String,
    #[validate(length(min = 1, max = 300))]
    pub title: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeSource {
    pub fn new(owner_id: &str, title: &str, source_type: SourceType, url: Option<String>) -> Self {
        Self {
            id: crate::models::new_id(),
            owner_id: owner_id.to_string(),
            title: title.to_string(),
            source_type,
            url,
            chunk_count: 0,
            created_at: Utc::now(),
        }
    }
}

impl Record for KnowledgeSource {
    const TABLE: &'static str = "knowledge_sources";
    const OWNER_FIELD: Option<&'static str> = Some("owner_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// One stored piece of a source with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    pub source_id: String,
    pub owner_id: String,
    pub chunk_index: usize,
    pub content: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeChunk {
    pub fn new(source: &KnowledgeSource, chunk_index: usize, content: String, embedding: Vec<f32>) -> Self {
        Self {
            id: crate::models::new_id(),
            source_id: source.id.clone(),
            owner_id: source.owner_id.clone(),
            chunk_index,
            content,
            embedding,
            created_at: Utc::now(),
        }
    }
}

impl Record for KnowledgeChunk {
    const TABLE: &'static str = "knowledge_chunks";
    const OWNER_FIELD: Option<&'static str> = Some("owner_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
