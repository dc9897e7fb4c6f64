//! Regulatory sync
//!
//! Asks the search-backed chat model for recent ANVISA updates and stores
//! them as regulatory alerts.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::error::Result;
use crate::llm::{ChatMessage, ChatModel, ChatOptions};
use crate::models::{AgentOutput, RegulatoryAlert, Severity, new_id};
use crate::storage::factory::Table;
use crate::storage::repository::Repository;

const SOURCE: &str = "perplexity";

const SYNC_PROMPT: &str = "Liste as atualizações regulatórias mais recentes da ANVISA relevantes \
para a indústria farmacêutica (RDCs, INs, consultas públicas, alertas de recolhimento). Responda \
APENAS com um array JSON de objetos no formato \
{\"title\": string, \"summary\": string, \"severity\": \"low\"|\"medium\"|\"high\"|\"critical\", \"url\": string}.";

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SyncRequest {
    /// Narrow the search to a topic, e.g. "estabilidade"
    #[serde(default)]
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncResponse {
    pub alerts: Vec<RegulatoryAlert>,
}

#[derive(Debug, Deserialize)]
struct RawAlert {
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

fn alert(title: String, summary: String, severity: Severity, url: Option<String>) -> RegulatoryAlert {
    RegulatoryAlert {
        id: new_id(),
        title,
        summary,
        source: SOURCE.to_string(),
        severity,
        published_at: None,
        url,
        created_at: chrono::Utc::now(),
    }
}

/// First `[` at which a JSON array of alerts parses.
///
/// Citation markers such as `[1]` fail to parse as alerts and are skipped;
/// text after the array is ignored.
fn first_alert_array(text: &str) -> Option<Vec<RawAlert>> {
    text.match_indices('[').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&text[start..])
            .into_iter::<Vec<RawAlert>>()
            .next()
            .and_then(|parsed| parsed.ok())
    })
}

/// Turn model text into alerts.
///
/// Uses the first JSON array found in the text; when there is none, or it
/// does not parse, the whole text becomes a single medium-severity alert.
pub fn parse_alerts(text: &str) -> Vec<RegulatoryAlert> {
    match first_alert_array(text) {
        Some(raw) => raw
            .into_iter()
            .filter(|a| !a.title.trim().is_empty())
            .map(|a| {
                let severity = a
                    .severity
                    .as_deref()
                    .map(Severity::parse_lenient)
                    .unwrap_or_default();
                let url = a.url.filter(|u| !u.trim().is_empty());
                alert(a.title.trim().to_string(), a.summary.trim().to_string(), severity, url)
            })
            .collect(),
        None if text.trim().is_empty() => Vec::new(),
        None => {
            warn!("regulatory sync answer had no JSON array, storing raw text");
            vec![alert(
                "Atualização regulatória ANVISA".to_string(),
                text.trim().to_string(),
                Severity::Medium,
                None,
            )]
        }
    }
}

pub struct RegulatoryService {
    chat: Arc<dyn ChatModel>,
    alerts: Table<RegulatoryAlert>,
    outputs: Table<AgentOutput>,
}

impl RegulatoryService {
    pub fn new(chat: Arc<dyn ChatModel>, alerts: Table<RegulatoryAlert>, outputs: Table<AgentOutput>) -> Self {
        Self { chat, alerts, outputs }
    }

    #[instrument(skip(self, request), fields(user_id = %user_id))]
    pub async fn sync(&self, user_id: &str, request: SyncRequest) -> Result<SyncResponse> {
        request.validate()?;

        let mut prompt = SYNC_PROMPT.to_string();
        if let Some(topic) = request.topic.as_deref().filter(|t| !t.trim().is_empty()) {
            prompt.push_str(&format!(" Foque no tema: {}.", topic));
        }

        let messages = [ChatMessage::user(prompt)];
        let options = ChatOptions {
            temperature: Some(0.2),
            ..Default::default()
        };
        let answer = self.chat.complete(&messages, &options).await?;

        let mut alerts = parse_alerts(&answer);
        if let Some(limit) = request.limit {
            alerts.truncate(limit);
        }
        for alert in &alerts {
            self.alerts.create(alert).await?;
        }

        self.outputs
            .create(
                &AgentOutput::completed(user_id, "regulatory", json!({"topic": request.topic}), &answer)
                    .with_metadata(json!({"alerts": alerts.len(), "model": self.chat.model()})),
            )
            .await?;

        info!(alerts = alerts.len(), "regulatory alerts synced");
        Ok(SyncResponse { alerts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryRepository;
    use crate::storage::repository::Filter;
    use async_trait::async_trait;

    #[test]
    fn test_parse_array_inside_prose() {
        let text = r#"Aqui estão as atualizações:
```json
[
  {"title": "RDC 900/2024", "summary": "Novas regras de rotulagem", "severity": "alta", "url": "https://anvisa.gov.br/rdc900"},
  {"title": "IN 300", "summary": "Estabilidade", "severity": "low"},
  {"title": "", "summary": "ignorado"}
]
```
Fonte: ANVISA"#;

        let alerts = parse_alerts(text);
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[0].url.as_deref(), Some("https://anvisa.gov.br/rdc900"));
        assert_eq!(alerts[1].severity, Severity::Low);
        assert!(alerts.iter().all(|a| a.source == "perplexity"));
    }

    #[test]
    fn test_parse_falls_back_to_raw_text() {
        let alerts = parse_alerts("A ANVISA publicou hoje a RDC 901 sobre farmacovigilância.");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert!(alerts[0].summary.contains("RDC 901"));

        assert!(parse_alerts("   ").is_empty());
    }

    #[test]
    fn test_parse_skips_citation_markers() {
        let after = "Atualizações:\n[{\"title\":\"RDC 900\",\"summary\":\"Rotulagem\",\"severity\":\"high\"}]\nFontes: [1][2]";
        let alerts = parse_alerts(after);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "RDC 900");
        assert_eq!(alerts[0].severity, Severity::High);

        let before = "Segundo a ANVISA [1], seguem:\n[{\"title\":\"RDC 900\",\"summary\":\"Rotulagem\"}] [2]";
        let alerts = parse_alerts(before);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "RDC 900");
        assert_eq!(alerts[0].summary, "Rotulagem");
    }

    #[test]
    fn test_citations_alone_fall_back_to_raw_text() {
        let alerts = parse_alerts("Nenhuma RDC nova esta semana [1].");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "Atualização regulatória ANVISA");
    }

    struct FixedChat(&'static str);

    #[async_trait]
    impl ChatModel for FixedChat {
        async fn complete(&self, _: &[ChatMessage], _: &ChatOptions) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn provider(&self) -> &str {
            "perplexity"
        }

        fn model(&self) -> &str {
            "sonar"
        }
    }

    #[tokio::test]
    async fn test_sync_stores_alerts_and_output() {
        let alerts: Table<RegulatoryAlert> = Arc::new(MemoryRepository::new());
        let outputs: Table<AgentOutput> = Arc::new(MemoryRepository::new());
        let service = RegulatoryService::new(
            Arc::new(FixedChat(r#"[{"title":"A","summary":"a","severity":"critical"},{"title":"B","summary":"b"}]"#)),
            alerts.clone(),
            outputs.clone(),
        );

        let response = service
            .sync("u1", SyncRequest { topic: None, limit: Some(1) })
            .await
            .unwrap();

        assert_eq!(response.alerts.len(), 1);
        assert_eq!(response.alerts[0].severity, Severity::Critical);
        assert_eq!(alerts.count(&Filter::new()).await.unwrap(), 1);
        assert_eq!(outputs.count(&Filter::new().eq("agent", "regulatory")).await.unwrap(), 1);
    }
}
