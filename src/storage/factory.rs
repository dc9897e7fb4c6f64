//! Storage factory
//!
//! Builds the set of table repositories for the configured backend.

use std::sync::Arc;
use tracing::info;

use crate::config::config::DatabaseConfig;
use crate::error::{AppError, Result};
use crate::models::{
    AgentOutput, Company, ComplianceTracking, FunctionInvocation, HandoffJob, IntegrationData,
    KnowledgeChunk, KnowledgeSource, Laboratory, Notification, PerformanceMetric, Profile,
    Project, RegulatoryAlert,
};
use crate::storage::memory::MemoryRepository;
use crate::storage::repository::{Record, Repository};

#[cfg(feature = "surrealdb")]
use crate::storage::surrealdb::SurrealStore;

/// Shared handle to one table
pub type Table<T> = Arc<dyn Repository<T>>;

/// All persisted tables
#[derive(Clone)]
pub struct Tables {
    pub profiles: Table<Profile>,
    pub companies: Table<Company>,
    pub laboratories: Table<Laboratory>,
    pub projects: Table<Project>,
    pub notifications: Table<Notification>,
    pub knowledge_sources: Table<KnowledgeSource>,
    pub knowledge_chunks: Table<KnowledgeChunk>,
    pub agent_outputs: Table<AgentOutput>,
    pub handoff_jobs: Table<HandoffJob>,
    pub performance_metrics: Table<PerformanceMetric>,
    pub regulatory_alerts: Table<RegulatoryAlert>,
    pub integration_data: Table<IntegrationData>,
    pub compliance_tracking: Table<ComplianceTracking>,
    pub function_invocations: Table<FunctionInvocation>,
}

impl std::fmt::Debug for Tables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tables").finish_non_exhaustive()
    }
}

impl Tables {
    /// Build every table with the given constructor
    fn build<M: TableMaker>(make: &M) -> Self {
        Self {
            profiles: make.table(),
            companies: make.table(),
            laboratories: make.table(),
            projects: make.table(),
            notifications: make.table(),
            knowledge_sources: make.table(),
            knowledge_chunks: make.table(),
            agent_outputs: make.table(),
            handoff_jobs: make.table(),
            performance_metrics: make.table(),
            regulatory_alerts: make.table(),
            integration_data: make.table(),
            compliance_tracking: make.table(),
            function_invocations: make.table(),
        }
    }

    /// In-memory tables
    pub fn in_memory() -> Self {
        Self::build(&MemoryMaker)
    }
}

trait TableMaker {
    fn table<T: Record>(&self) -> Table<T>;
}

struct MemoryMaker;

impl TableMaker for MemoryMaker {
    fn table<T: Record>(&self) -> Table<T> {
        Arc::new(MemoryRepository::<T>::new())
    }
}

#[cfg(feature = "surrealdb")]
impl TableMaker for SurrealStore {
    fn table<T: Record>(&self) -> Table<T> {
        Arc::new(self.repository::<T>())
    }
}

/// Storage factory
pub struct StorageFactory;

impl StorageFactory {
    /// Create tables for the configured backend
    pub async fn create(config: &DatabaseConfig) -> Result<Tables> {
        match config.backend.as_str() {
            "memory" | "" => {
                info!("using in-memory storage");
                Ok(Tables::in_memory())
            }
            #[cfg(feature = "surrealdb")]
            "surrealdb" => {
                let store = SurrealStore::connect(config).await?;
                store.ping().await?;
                Ok(Tables::build(&store))
            }
            other => Err(AppError::Config(format!(
                "unsupported storage backend: {}",
                other
            ))),
        }
    }
}
