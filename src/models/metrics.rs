//! Analytics and integration rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::storage::Record;

/// A business KPI sample shown on the analytics dashboard
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PerformanceMetric {
    pub id: String,
    pub owner_id: String,
    #[validate(length(min = 1, max = 100))]
    pub metric_name: String,
    pub value: f64,
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub tags: Value,
    pub created_at: DateTime<Utc>,
}

impl Record for PerformanceMetric {
    const TABLE: &'static str = "performance_metrics";
    const OWNER_FIELD: Option<&'static str> = Some("owner_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Raw payload synced from an external system (ERP, LIMS, ...)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IntegrationData {
    pub id: String,
    pub owner_id: String,
    #[validate(length(min = 1, max = 100))]
    pub integration: String,
    pub payload: Value,
    #[serde(default)]
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for IntegrationData {
    const TABLE: &'static str = "integration_data";
    const OWNER_FIELD: Option<&'static str> = Some("owner_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
