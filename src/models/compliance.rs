//! Regulatory alerts and compliance tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::storage::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Lenient parse of model output ("alta", "HIGH", ...)
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "low" | "baixa" | "baixo" => Severity::Low,
            "high" | "alta" | "alto" => Severity::High,
            "critical" | "critica" | "crítica" | "critico" | "crítico" => Severity::Critical,
            _ => Severity::Medium,
        }
    }
}

/// A regulatory update published by ANVISA or similar bodies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatoryAlert {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub source: String,
    pub severity: Severity,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for RegulatoryAlert {
    const TABLE: &'static str = "regulatory_alerts";

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    Partial,
    NonCompliant,
    #[default]
    Pending,
}

impl ComplianceStatus {
    /// Status implied by a checklist score
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ComplianceStatus::Compliant
        } else if score >= 60.0 {
            ComplianceStatus::Partial
        } else {
            ComplianceStatus::NonCompliant
        }
    }
}

/// Score of a company against a regulatory checklist
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ComplianceTracking {
    pub id: String,
    pub owner_id: String,
    pub company_id: String,
    #[validate(length(min = 1, max = 200))]
    pub checklist: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub score: f64,
    #[serde(default)]
    pub status: ComplianceStatus,
    #[serde(default)]
    pub last_review_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Record for ComplianceTracking {
    const TABLE: &'static str = "compliance_tracking";
    const OWNER_FIELD: Option<&'static str> = Some("owner_id");

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

    #[test]
    fn test_severity_parse_lenient() {
        assert_eq!(Severity::parse_lenient("Alta"), Severity::High);
        assert_eq!(Severity::parse_lenient("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse_lenient("whatever"), Severity::Medium);
    }

    #[test]
    fn test_compliance_status_from_score() {
        assert_eq!(ComplianceStatus::from_score(95.0), ComplianceStatus::Compliant);
        assert_eq!(ComplianceStatus::from_score(60.0), ComplianceStatus::Partial);
        assert_eq!(ComplianceStatus::from_score(10.0), ComplianceStatus::NonCompliant);
    }
}
