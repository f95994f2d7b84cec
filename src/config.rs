//! Environment-driven settings that are not tied to one provider

use std::net::SocketAddr;

use crate::cache::DEFAULT_CACHE_TTL_HOURS;
use crate::rate_limit::DEFAULT_DAILY_LIMIT;

/// Read an env var, treating blank values as unset
pub fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Quota and cache policy for trivia generation
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Generations allowed per user per UTC day
    pub daily_limit: u32,
    /// How long a cached result set stays usable
    pub cache_ttl: chrono::Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            cache_ttl: chrono::Duration::hours(DEFAULT_CACHE_TTL_HOURS),
        }
    }
}

impl GenerationConfig {
    /// Load from TRIVIA_DAILY_LIMIT and TRIVIA_CACHE_TTL_HOURS
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let daily_limit = env_non_empty("TRIVIA_DAILY_LIMIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.daily_limit);

        let cache_ttl = env_non_empty("TRIVIA_CACHE_TTL_HOURS")
            .and_then(|v| v.parse().ok())
            .map(chrono::Duration::hours)
            .unwrap_or(defaults.cache_ttl);

        tracing::info!(
            daily_limit,
            cache_ttl_hours = cache_ttl.num_hours(),
            "Generation config loaded"
        );

        Self {
            daily_limit,
            cache_ttl,
        }
    }
}

/// Listen address from BIND_ADDR, defaulting to 0.0.0.0:8080
pub fn bind_addr_from_env() -> SocketAddr {
    env_non_empty("BIND_ADDR")
        .and_then(|addr| match addr.parse() {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::warn!(addr, error = %e, "Ignoring invalid BIND_ADDR");
                None
            }
        })
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080)))
}
