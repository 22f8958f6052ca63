//! Engine configuration, resolvable from the environment.

use rand::Rng;
use std::time::Duration;

use crate::validation::{Grade, LoopPolicy};

/// Tunables for the generation engine.
///
/// Defaults are production values; [`EngineConfig::from_env`] overrides
/// them from `FLOWSMITH_*` variables (a `.env` file is honored).
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Hard ceiling on generation attempts per request.
    pub max_attempts: u32,
    /// Lowest acceptable grade for a `Ready` outcome.
    pub min_grade: Grade,
    /// Deadline for one model request.
    pub request_timeout: Duration,
    /// Deadline for the single template-search call.
    pub template_timeout: Duration,
    /// Base delay before the second attempt; doubles per retry.
    pub backoff_base: Duration,
    /// Upper bound on the backoff delay.
    pub backoff_cap: Duration,
    /// Concurrent in-flight requests allowed through the engine.
    pub max_concurrency: usize,
    /// Severity of cycle findings during validation.
    pub loop_policy: LoopPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_grade: Grade::D,
            request_timeout: Duration::from_secs(30),
            template_timeout: Duration::from_secs(3),
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(8),
            max_concurrency: 8,
            loop_policy: LoopPolicy::Warn,
        }
    }
}

impl EngineConfig {
    /// Resolve configuration from `FLOWSMITH_*` environment variables,
    /// falling back to the defaults for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();
        Self {
            max_attempts: env_parse("FLOWSMITH_MAX_ATTEMPTS").unwrap_or(defaults.max_attempts),
            min_grade: env_parse("FLOWSMITH_MIN_GRADE").unwrap_or(defaults.min_grade),
            request_timeout: env_millis("FLOWSMITH_REQUEST_TIMEOUT_MS")
                .unwrap_or(defaults.request_timeout),
            template_timeout: env_millis("FLOWSMITH_TEMPLATE_TIMEOUT_MS")
                .unwrap_or(defaults.template_timeout),
            backoff_base: env_millis("FLOWSMITH_BACKOFF_BASE_MS").unwrap_or(defaults.backoff_base),
            backoff_cap: env_millis("FLOWSMITH_BACKOFF_CAP_MS").unwrap_or(defaults.backoff_cap),
            max_concurrency: env_parse("FLOWSMITH_MAX_CONCURRENCY")
                .filter(|&n| n > 0)
                .unwrap_or(defaults.max_concurrency),
            loop_policy: match std::env::var("FLOWSMITH_LOOP_POLICY").as_deref() {
                Ok("error") => LoopPolicy::Error,
                Ok("warn") => LoopPolicy::Warn,
                _ => defaults.loop_policy,
            },
        }
    }

    /// Delay before retry number `attempt` (1-based count of completed
    /// attempts): capped exponential backoff with up to 50% jitter, so
    /// concurrent retries spread out instead of stampeding.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self
            .backoff_base
            .saturating_mul(2u32.saturating_pow(exponent))
            .min(self.backoff_cap);
        let jitter_budget = base.as_millis() as u64 / 2;
        let jitter = if jitter_budget == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_budget)
        };
        base + Duration::from_millis(jitter)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.trim().parse().ok()
}

fn env_millis(name: &str) -> Option<Duration> {
    env_parse::<u64>(name).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.min_grade, Grade::D);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.max_concurrency, 8);
    }

    #[test]
    fn backoff_grows_and_stays_capped() {
        let config = EngineConfig::default();
        for attempt in 1..10 {
            let delay = config.backoff_delay(attempt);
            assert!(delay >= config.backoff_base);
            // Cap plus the 50% jitter budget.
            assert!(delay <= config.backoff_cap + config.backoff_cap / 2);
        }
        assert!(config.backoff_delay(2) >= Duration::from_millis(1000));
    }
}
