//! Companies and laboratories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::storage::Record;

/// A pharmaceutical company registered on the marketplace
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Company {
    pub id: String,
    pub owner_id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    /// 14 digits, no punctuation
    pub cnpj: String,
    #[serde(default)]
    pub city: Option<String>,
    /// Two-letter state code (UF)
    #[serde(default)]
    #[validate(length(equal = 2))]
    pub state: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
    /// Products or therapeutic areas the company needs analysed
    #[serde(default)]
    pub needs: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record for Company {
    const TABLE: &'static str = "companies";
    const OWNER_FIELD: Option<&'static str> = Some("owner_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// An analytical laboratory offering services
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Laboratory {
    pub id: String,
    pub owner_id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    #[validate(length(equal = 2))]
    pub state: Option<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    /// Analyses per month the lab can take on
    #[serde(default)]
    pub capacity: u32,
    #[serde(default = "default_available")]
    pub available: bool,
    pub created_at: DateTime<Utc>,
}

fn default_available() -> bool {
    true
}

impl Record for Laboratory {
    const TABLE: &'static str = "laboratories";
    const OWNER_FIELD: Option<&'static str> = Some("owner_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
