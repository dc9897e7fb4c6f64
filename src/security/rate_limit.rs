//! Rate limiting
//!
//! Counts a user's calls to one function over the trailing window using
//! the `function_invocations` audit table. Calls older than the window are
//! purged on each check, so the table only holds the live window.
//! Count-then-insert is not atomic across service instances.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::config::SecurityConfig;
use crate::error::{AppError, Result};
use crate::models::FunctionInvocation;
use crate::storage::factory::Table;
use crate::storage::repository::Filter;

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls allowed per user and function inside one window
    pub max_calls: u32,
    /// Window length in seconds
    pub window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 20,
            window_seconds: 300,
        }
    }
}

/// Rate limit result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RateLimitResult {
    /// Call recorded
    Allowed {
        /// Calls left in the current window
        remaining: u32,
    },
    /// Call rejected
    Limited {
        /// Seconds until the oldest call leaves the window
        retry_after: u64,
    },
}

#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    invocations: Table<FunctionInvocation>,
    enabled: bool,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, invocations: Table<FunctionInvocation>, enabled: bool) -> Self {
        Self {
            config,
            invocations,
            enabled,
        }
    }

    pub fn from_settings(settings: &SecurityConfig, invocations: Table<FunctionInvocation>) -> Self {
        let config = RateLimitConfig {
            max_calls: settings.rate_limit_max_calls,
            window_seconds: settings.rate_limit_window_secs,
        };
        Self::new(config, invocations, settings.rate_limit_enabled)
    }

    fn window(&self) -> Duration {
        Duration::seconds(self.config.window_seconds as i64)
    }

    /// Check and, if allowed, record a call made now
    pub async fn check(&self, user_id: &str, function_name: &str) -> Result<RateLimitResult> {
        self.check_at(user_id, function_name, Utc::now()).await
    }

    /// Check and record a call made at `now`
    pub async fn check_at(
        &self,
        user_id: &str,
        function_name: &str,
        now: DateTime<Utc>,
    ) -> Result<RateLimitResult> {
        if !self.enabled {
            return Ok(RateLimitResult::Allowed {
                remaining: self.config.max_calls,
            });
        }

        let window_start = now - self.window();
        let expired = self.invocations.purge(&Filter::new().before(window_start)).await?;
        if expired > 0 {
            tracing::debug!(expired, "expired function invocations purged");
        }

        let filter = Filter::new()
            .eq("user_id", user_id)
            .eq("function_name", function_name)
            .since(window_start)
            .oldest_first();
        let used = self.invocations.count(&filter).await?;

        if used >= self.config.max_calls as u64 {
            let oldest = self.invocations.list(&filter, 1, 0).await?;
            let retry_after = oldest
                .first()
                .map(|call| (call.created_at + self.window() - now).num_seconds().max(1) as u64)
                .unwrap_or(self.config.window_seconds);
            return Ok(RateLimitResult::Limited { retry_after });
        }

        self.invocations
            .create(&FunctionInvocation::new(user_id, function_name, now))
            .await?;

        Ok(RateLimitResult::Allowed {
            remaining: self.config.max_calls - used as u32 - 1,
        })
    }

    /// Like `check`, but a rejection becomes `AppError::RateLimited`
    pub async fn enforce(&self, user_id: &str, function_name: &str) -> Result<()> {
        match self.check(user_id, function_name).await? {
            RateLimitResult::Allowed { .. } => Ok(()),
            RateLimitResult::Limited { retry_after } => {
                tracing::warn!(user_id, function_name, retry_after, "rate limit exceeded");
                Err(AppError::RateLimited { retry_after })
            }
        }
    }
}
