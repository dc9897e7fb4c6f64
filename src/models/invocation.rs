use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Record;

/// Audit row written for each rate-limited function call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInvocation {
    pub id: String,
    pub user_id: String,
    pub function_name: String,
    pub created_at: DateTime<Utc>,
}

impl FunctionInvocation {
    pub fn new(user_id: &str, function_name: &str, at: DateTime<Utc>) -> Self {
        Self {
            id: crate::models::new_id(),
            user_id: user_id.to_string(),
            function_name: function_name.to_string(),
            created_at: at,
        }
    }
}

impl Record for FunctionInvocation {
    const TABLE: &'static str = "function_invocations";
    const OWNER_FIELD: Option<&'static str> = Some("user_id");

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
