//! Chat-model backed assistants: chatbot, document assistant and the
//! coordinator that fans work out to other agents through handoff jobs.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::error::{AppError, Result};
use crate::llm::{ChatMessage, ChatModel, ChatOptions, Role};
use crate::models::AgentOutput;
use crate::services::handoff::{HandoffService, function_for_agent};
use crate::storage::factory::Table;
use crate::storage::repository::Repository;

/// History turns forwarded to the model
const MAX_HISTORY: usize = 20;

const CHATBOT_PROMPT: &str = "Você é o assistente da PharmaConnect Brasil, especialista no mercado \
farmacêutico brasileiro: regulação ANVISA, Boas Práticas de Fabricação (BPF/GMP), registro de \
medicamentos, estudos de estabilidade e parcerias com laboratórios analíticos. Responda em \
português, de forma objetiva, e cite a norma aplicável (RDC, IN) quando souber.";

const COORDINATOR_PROMPT: &str = "Você coordena agentes de IA da PharmaConnect Brasil. Dada uma \
tarefa, escreva um plano curto em etapas numeradas indicando qual agente executa cada etapa. \
Agentes disponíveis: chatbot, document, regulatory, sentiment, roi, knowledge.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 8000))]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentTask {
    #[default]
    Summarize,
    Analyze,
    Compliance,
    Translate,
}

impl DocumentTask {
    fn instruction(self) -> &'static str {
        match self {
            Self::Summarize => "Resuma o documento em tópicos, destacando obrigações, prazos e valores.",
            Self::Analyze => "Analise o documento: pontos fortes, riscos, lacunas e recomendações.",
            Self::Compliance => {
                "Avalie a conformidade do documento com a regulação ANVISA e as BPF. Liste \
                 não conformidades com a norma correspondente e a ação corretiva sugerida."
            }
            Self::Translate => {
                "Traduza o documento entre português e inglês (para o idioma oposto ao original), \
                 preservando a terminologia técnica farmacêutica."
            }
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Analyze => "analyze",
            Self::Compliance => "compliance",
            Self::Translate => "translate",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DocumentRequest {
    #[validate(length(min = 1, max = 100000))]
    pub document: String,
    #[serde(default)]
    pub task: DocumentTask,
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OrchestrateRequest {
    #[validate(length(min = 1, max = 8000))]
    pub task: String,
    #[serde(default)]
    pub agents: Vec<String>,
    /// Per-agent payload overrides for the enqueued jobs
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssistantResponse {
    pub output: String,
    pub output_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrateResponse {
    pub output: String,
    pub output_id: String,
    pub jobs: Vec<String>,
}

/// Payload a target agent's function expects, derived from the task
fn default_payload(agent: &str, task: &str) -> Value {
    match agent {
        "chatbot" => json!({"message": task}),
        "document" => json!({"document": task, "task": "analyze"}),
        "sentiment" => json!({"text": task}),
        "knowledge" => json!({"question": task}),
        _ => json!({"task": task}),
    }
}

pub struct AssistantService {
    chat: Arc<dyn ChatModel>,
    outputs: Table<AgentOutput>,
    handoff: Arc<HandoffService>,
}

impl AssistantService {
    pub fn new(chat: Arc<dyn ChatModel>, outputs: Table<AgentOutput>, handoff: Arc<HandoffService>) -> Self {
        Self {
            chat,
            outputs,
            handoff,
        }
    }

    async fn store(&self, user_id: &str, agent: &str, input: Value, output: &str) -> Result<AgentOutput> {
        let row = AgentOutput::completed(user_id, agent, input, output).with_metadata(json!({
            "provider": self.chat.provider(),
            "model": self.chat.model(),
        }));
        self.outputs.create(&row).await
    }

    #[instrument(skip(self, request), fields(user_id = %user_id, history = request.history.len()))]
    pub async fn chat(&self, user_id: &str, request: ChatRequest) -> Result<AssistantResponse> {
        request.validate()?;

        let mut messages = vec![ChatMessage::system(CHATBOT_PROMPT)];
        let skip = request.history.len().saturating_sub(MAX_HISTORY);
        messages.extend(
            request
                .history
                .iter()
                .skip(skip)
                .filter_map(|turn| match turn.role {
                    Role::User => Some(ChatMessage::user(turn.content.as_str())),
                    Role::Assistant => Some(ChatMessage::assistant(turn.content.as_str())),
                    Role::System => None,
                }),
        );
        messages.push(ChatMessage::user(request.message.as_str()));

        let output = self.chat.complete(&messages, &ChatOptions::default()).await?;
        let stored = self
            .store(user_id, "chatbot", json!({"message": request.message}), &output)
            .await?;

        Ok(AssistantResponse {
            output,
            output_id: stored.id,
        })
    }

    #[instrument(skip(self, request), fields(user_id = %user_id, task = request.task.as_str()))]
    pub async fn document(&self, user_id: &str, request: DocumentRequest) -> Result<AssistantResponse> {
        request.validate()?;

        let mut prompt = format!("{}\n\nDocumento:\n{}", request.task.instruction(), request.document);
        if let Some(question) = request.question.as_deref().filter(|q| !q.trim().is_empty()) {
            prompt.push_str(&format!("\n\nPergunta adicional: {}", question));
        }

        let messages = [ChatMessage::system(CHATBOT_PROMPT), ChatMessage::user(prompt)];
        let options = ChatOptions {
            temperature: Some(0.3),
            ..Default::default()
        };
        let output = self.chat.complete(&messages, &options).await?;

        let input = json!({
            "task": request.task.as_str(),
            "question": request.question,
            "document_chars": request.document.chars().count(),
        });
        let stored = self.store(user_id, "document", input, &output).await?;

        Ok(AssistantResponse {
            output,
            output_id: stored.id,
        })
    }

    /// Plan a task and enqueue one chained job per requested agent
    #[instrument(skip(self, request), fields(user_id = %user_id, agents = request.agents.len()))]
    pub async fn orchestrate(&self, user_id: &str, request: OrchestrateRequest) -> Result<OrchestrateResponse> {
        request.validate()?;
        if let Some(unknown) = request.agents.iter().find(|a| function_for_agent(a).is_none()) {
            return Err(AppError::Validation(format!("unknown agent: {}", unknown)));
        }

        let messages = [
            ChatMessage::system(COORDINATOR_PROMPT),
            ChatMessage::user(request.task.as_str()),
        ];
        let output = self.chat.complete(&messages, &ChatOptions::default()).await?;
        let stored = self
            .store(
                user_id,
                "coordinator",
                json!({"task": request.task, "agents": request.agents}),
                &output,
            )
            .await?;

        let mut jobs = Vec::with_capacity(request.agents.len());
        let mut source = "coordinator".to_string();
        for agent in &request.agents {
            let payload = request
                .inputs
                .get(agent)
                .cloned()
                .unwrap_or_else(|| default_payload(agent, &request.task));
            let job = self.handoff.enqueue(user_id, &source, agent, payload).await?;
            jobs.push(job.id);
            source = agent.clone();
        }

        info!(output_id = %stored.id, jobs = jobs.len(), "coordinator plan stored");
        Ok(OrchestrateResponse {
            output,
            output_id: stored.id,
            jobs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HandoffJob, JobStatus};
    use crate::services::handoff::Dispatcher;
    use crate::storage::memory::MemoryRepository;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedChat {
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, messages: &[ChatMessage], _: &ChatOptions) -> Result<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok("1. chatbot responde\n2. roi calcula".into())
        }

        fn provider(&self) -> &str {
            "test"
        }

        fn model(&self) -> &str {
            "test-model"
        }
    }

    struct NoopDispatcher;

    #[async_trait]
    impl Dispatcher for NoopDispatcher {
        async fn dispatch(&self, _: &str, _: &HandoffJob) -> Result<Value> {
            Ok(Value::Null)
        }
    }

    fn service() -> (AssistantService, Arc<ScriptedChat>, Arc<HandoffService>, Table<AgentOutput>) {
        let chat = Arc::new(ScriptedChat::default());
        let outputs: Table<AgentOutput> = Arc::new(MemoryRepository::new());
        let handoff = Arc::new(HandoffService::new(
            Arc::new(MemoryRepository::new()),
            Arc::new(NoopDispatcher),
            5,
        ));
        let service = AssistantService::new(chat.clone(), outputs.clone(), handoff.clone());
        (service, chat, handoff, outputs)
    }

    #[tokio::test]
    async fn test_chat_forwards_history_and_stores_output() {
        let (service, chat, _, outputs) = service();
        let request = ChatRequest {
            message: "Como registrar um genérico?".into(),
            history: vec![
                HistoryMessage {
                    role: Role::User,
                    content: "Olá".into(),
                },
                HistoryMessage {
                    role: Role::Assistant,
                    content: "Olá! Como posso ajudar?".into(),
                },
            ],
        };

        let response = service.chat("u1", request).await.unwrap();

        let sent = chat.calls.lock().unwrap()[0].clone();
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[0].role, Role::System);
        assert!(sent[0].content.contains("ANVISA"));
        assert_eq!(sent[2], ChatMessage::assistant("Olá! Como posso ajudar?"));
        assert_eq!(sent[3].content, "Como registrar um genérico?");

        let stored = outputs.get_by_id(&response.output_id).await.unwrap().unwrap();
        assert_eq!(stored.agent, "chatbot");
        assert_eq!(stored.user_id, "u1");
    }

    #[tokio::test]
    async fn test_document_task_selects_instruction() {
        let (service, chat, _, _) = service();
        let request = DocumentRequest {
            document: "Procedimento de limpeza da linha 3".into(),
            task: DocumentTask::Compliance,
            question: Some("Atende à RDC 658?".into()),
        };

        service.document("u1", request).await.unwrap();

        let prompt = chat.calls.lock().unwrap()[0][1].content.clone();
        assert!(prompt.contains("conformidade"));
        assert!(prompt.contains("Atende à RDC 658?"));
    }

    #[tokio::test]
    async fn test_orchestrate_chains_jobs() {
        let (service, _, handoff, _) = service();
        let request = OrchestrateRequest {
            task: "Avaliar viabilidade de um novo antibiótico".into(),
            agents: vec!["chatbot".into(), "roi".into()],
            inputs: HashMap::from([(
                "roi".to_string(),
                json!({"investment": 1000.0, "market_size": "large"}),
            )]),
        };

        let response = service.orchestrate("u1", request).await.unwrap();
        assert_eq!(response.jobs.len(), 2);

        let first = handoff.get("u1", &response.jobs[0]).await.unwrap();
        let second = handoff.get("u1", &response.jobs[1]).await.unwrap();
        assert_eq!(first.source_agent, "coordinator");
        assert_eq!(first.payload["message"], "Avaliar viabilidade de um novo antibiótico");
        assert_eq!(second.source_agent, "chatbot");
        assert_eq!(second.payload["investment"], 1000.0);
        assert_eq!(second.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_orchestrate_rejects_unknown_agent_before_calling_model() {
        let (service, chat, _, _) = service();
        let request = OrchestrateRequest {
            task: "x".into(),
            agents: vec!["oracle".into()],
            inputs: HashMap::new(),
        };

        assert!(matches!(
            service.orchestrate("u1", request).await,
            Err(AppError::Validation(_))
        ));
        assert!(chat.calls.lock().unwrap().is_empty());
    }
}
