//! Security Module
//!
//! - Authentication (HS256 JWT bearer tokens)
//! - Rate limiting of function calls
//! - Security headers and CORS

pub mod auth;
pub mod middleware;
pub mod rate_limit;

pub use auth::{Claims, JwtAuth};
pub use rate_limit::{RateLimitConfig, RateLimitResult, RateLimiter};
