//! Data models
//!
//! Rows of the persisted tables: profiles, companies, laboratories,
//! projects, notifications, knowledge base, AI agent outputs and handoff
//! jobs, analytics and compliance records.

pub mod agent;
pub mod company;
pub mod compliance;
pub mod invocation;
pub mod knowledge;
pub mod metrics;
pub mod notification;
pub mod profile;
pub mod project;

pub use agent::*;
pub use company::*;
pub use compliance::*;
pub use invocation::*;
pub use knowledge::*;
pub use metrics::*;
pub use notification::*;
pub use profile::*;
pub use project::*;

use chrono::{DateTime, Utc};

/// Fresh row id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Creation timestamp default for deserialized rows
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
