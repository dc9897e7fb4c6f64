//! Function DTOs
//!
//! Request bodies of the functions whose logic lives in free functions.
//! Service-backed functions take the request types of their service.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct SentimentRequest {
    #[validate(length(min = 1, max = 20000))]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CnpjRequest {
    pub cnpj: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MatchRequest {
    pub company_id: String,
    #[serde(default)]
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct HandoffRunRequest {
    #[validate(range(min = 1, max = 100))]
    pub max_jobs: Option<usize>,
}
