//! AI handoff queue
//!
//! Functions enqueue jobs asking another agent to continue their work. A
//! runner claims pending jobs, dispatches them to the target agent's
//! function and writes the outcome back onto the job row.
//!
//! Claims are a conditional update on `status == "pending"`, so concurrent
//! runners never process the same job twice. There is no retry or lease:
//! a job whose runner dies while `processing` stays there.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{AppError, Result};
use crate::llm::upstream_error;
use crate::models::{HandoffJob, JobStatus, NotificationKind};
use crate::security::auth::JwtAuth;
use crate::services::notifications::Notifier;
use crate::storage::factory::Table;
use crate::storage::repository::{Filter, Repository};

/// Pending jobs examined per claim attempt
const CLAIM_SCAN: usize = 20;

/// Function serving each agent
pub fn function_for_agent(agent: &str) -> Option<&'static str> {
    match agent {
        "chatbot" => Some("ai-chatbot"),
        "document" => Some("ai-document-assistant"),
        "regulatory" => Some("regulatory-sync"),
        "sentiment" => Some("sentiment-analysis"),
        "roi" => Some("roi-calculator"),
        "knowledge" => Some("kb-rag"),
        _ => None,
    }
}

/// Runs a claimed job against a function
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, function: &str, job: &HandoffJob) -> Result<Value>;
}

/// Re-invokes functions over HTTP with a service-role token
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: String,
    auth: Arc<JwtAuth>,
}

impl HttpDispatcher {
    pub fn new(base_url: &str, auth: Arc<JwtAuth>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, function: &str, job: &HandoffJob) -> Result<Value> {
        let token = self.auth.issue_service_token(&job.user_id)?;
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, function))
            .bearer_auth(token)
            .json(&job.payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(upstream_error(function, response).await);
        }
        Ok(response.json().await?)
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    pub job_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnqueueRequest {
    pub target_agent: String,
    #[serde(default = "default_source_agent")]
    pub source_agent: String,
    #[serde(default)]
    pub payload: Value,
}

fn default_source_agent() -> String {
    "user".to_string()
}

pub struct HandoffService {
    jobs: Table<HandoffJob>,
    dispatcher: Arc<dyn Dispatcher>,
    notifier: Option<Notifier>,
    batch_size: usize,
}

impl HandoffService {
    pub fn new(jobs: Table<HandoffJob>, dispatcher: Arc<dyn Dispatcher>, batch_size: usize) -> Self {
        Self {
            jobs,
            dispatcher,
            notifier: None,
            batch_size: batch_size.max(1),
        }
    }

    /// Notify job owners when their jobs finish
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn enqueue(
        &self,
        user_id: &str,
        source_agent: &str,
        target_agent: &str,
        payload: Value,
    ) -> Result<HandoffJob> {
        if target_agent.trim().is_empty() {
            return Err(AppError::Validation("target_agent is required".into()));
        }
        let job = HandoffJob::new(user_id, source_agent, target_agent, payload);
        let job = self.jobs.create(&job).await?;
        debug!(job_id = %job.id, target = %job.target_agent, "handoff job enqueued");
        Ok(job)
    }

    /// The user's jobs, newest first
    pub async fn list(
        &self,
        user_id: &str,
        status: Option<JobStatus>,
        limit: usize,
        start: usize,
    ) -> Result<Vec<HandoffJob>> {
        let mut filter = Filter::new().owned_by::<HandoffJob>(user_id);
        if let Some(status) = status {
            filter = filter.eq("status", status.as_str());
        }
        self.jobs.list(&filter, limit, start).await
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<HandoffJob> {
        self.jobs
            .get_by_id(id)
            .await?
            .filter(|job| job.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("handoff job {}", id)))
    }

    /// Claim the oldest pending job, skipping any another runner took first
    pub async fn claim_next(&self) -> Result<Option<HandoffJob>> {
        let filter = Filter::new()
            .eq("status", JobStatus::Pending.as_str())
            .oldest_first();
        let pending = json!(JobStatus::Pending.as_str());

        for candidate in self.jobs.list(&filter, CLAIM_SCAN, 0).await? {
            let claimed = candidate.claimed();
            if self.jobs.update_if(&candidate.id, "status", &pending, &claimed).await? {
                return Ok(Some(claimed));
            }
            debug!(job_id = %candidate.id, "lost claim race, trying next job");
        }
        Ok(None)
    }

    /// Process at most one job
    pub async fn run_once(&self) -> Result<Option<HandoffJob>> {
        match self.claim_next().await? {
            Some(job) => Ok(Some(self.process(job).await?)),
            None => Ok(None),
        }
    }

    /// Process up to `max_jobs` jobs, stopping early when the queue is empty
    pub async fn run_batch(&self, max_jobs: usize) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        for _ in 0..max_jobs {
            let Some(job) = self.run_once().await? else {
                break;
            };
            summary.processed += 1;
            match job.status {
                JobStatus::Completed => summary.completed += 1,
                _ => summary.failed += 1,
            }
            summary.job_ids.push(job.id);
        }
        Ok(summary)
    }

    #[instrument(skip(self, job), fields(job_id = %job.id, target = %job.target_agent))]
    async fn process(&self, mut job: HandoffJob) -> Result<HandoffJob> {
        let outcome = match function_for_agent(&job.target_agent) {
            Some(function) => self.dispatcher.dispatch(function, &job).await,
            None => Err(AppError::Validation(format!(
                "unknown agent: {}",
                job.target_agent
            ))),
        };

        match outcome {
            Ok(result) => {
                info!("handoff job completed");
                job.complete(result);
            }
            Err(e) => {
                warn!(error = %e, "handoff job failed");
                job.fail(&e.to_string());
            }
        }
        self.jobs.update(&job.id, &job).await?;

        if let Some(notifier) = &self.notifier {
            let (kind, title) = match job.status {
                JobStatus::Completed => (NotificationKind::Ai, "Tarefa de IA concluída"),
                _ => (NotificationKind::Error, "Tarefa de IA falhou"),
            };
            let message = format!("{} → {}", job.source_agent, job.target_agent);
            if let Err(e) = notifier.notify(&job.user_id, kind, title, &message).await {
                warn!(error = %e, "failed to notify handoff owner");
            }
        }

        Ok(job)
    }

    /// Poll the queue every `interval` until `shutdown` flips to true
    pub fn spawn_worker(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), batch = self.batch_size, "handoff worker started");
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_batch(self.batch_size).await {
                            Ok(summary) if summary.processed > 0 => {
                                info!(processed = summary.processed, failed = summary.failed, "handoff batch finished");
                            }
                            Ok(_) => {}
                            Err(e) => error!(error = %e, "handoff batch failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("handoff worker stopped");
        })
    }
}
