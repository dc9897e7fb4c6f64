//! AI agent outputs and handoff jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::Record;

/// Processing status shared by agent outputs and handoff jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored result of one AI function call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    pub id: String,
    pub user_id: String,
    /// Agent / function that produced the output
    pub agent: String,
    pub input: Value,
    pub output: String,
    pub status: JobStatus,
    #[serde(default)]
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

impl AgentOutput {
    pub fn completed(user_id: &str, agent: &str, input: Value, output: &str) -> Self {
        Self {
            id: crate::models::new_id(),
            user_id: user_id.to_string(),
            agent: agent.to_string(),
            input,
            output: output.to_string(),
            status: JobStatus::Completed,
            metadata: Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

impl Record for AgentOutput {
    const TABLE: &'static str = "ai_agent_outputs";
    const OWNER_FIELD: Option<&'static str> = Some("user_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A pending cross-function invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffJob {
    pub id: String,
    pub user_id: String,
    pub source_agent: String,
    pub target_agent: String,
    pub payload: Value,
    pub status: JobStatus,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl HandoffJob {
    pub fn new(user_id: &str, source_agent: &str, target_agent: &str, payload: Value) -> Self {
        Self {
            id: crate::models::new_id(),
            user_id: user_id.to_string(),
            source_agent: source_agent.to_string(),
            target_agent: target_agent.to_string(),
            payload,
            status: JobStatus::Pending,
            attempts: 0,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Copy of the job in `processing` state
    pub fn claimed(&self) -> Self {
        let mut job = self.clone();
        job.status = JobStatus::Processing;
        job.attempts += 1;
        job.started_at = Some(Utc::now());
        job
    }

    pub fn complete(&mut self, result: Value) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: &str) {
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
    }
}

impl Record for HandoffJob {
    const TABLE: &'static str = "ai_handoff_jobs";
    const OWNER_FIELD: Option<&'static str> = Some("user_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_lifecycle() {
        let job = HandoffJob::new("u1", "coordinator", "chatbot", json!({"message": "oi"}));
        assert_eq!(job.status, JobStatus::Pending);

        let mut claimed = job.claimed();
        assert_eq!(claimed.status, JobStatus::Processing);
        assert_eq!(claimed.attempts, 1);
        assert!(claimed.started_at.is_some());

        claimed.fail("boom");
        assert!(claimed.status.is_terminal());
        assert_eq!(claimed.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(serde_json::to_value(JobStatus::Processing).unwrap(), json!("processing"));
    }
}
