//! User profile

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::storage::Record;

/// Kind of account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    #[default]
    PharmaceuticalCompany,
    Laboratory,
    Consultant,
    Supplier,
    Admin,
}

/// Public profile of a user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Profile {
    pub id: String,
    /// Auth subject this profile belongs to
    pub user_id: String,
    #[validate(length(min = 1, max = 200))]
    pub full_name: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub company_name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default = "crate::models::now")]
    pub updated_at: DateTime<Utc>,
}

impl Record for Profile {
    const TABLE: &'static str = "profiles";
    const OWNER_FIELD: Option<&'static str> = Some("user_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
