//! Engine configuration loaded from the environment

use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Allow participants to join a session that is already playing
    pub allow_late_join: bool,
    /// Deadline for any single storage operation
    pub storage_timeout: Duration,
    /// Attempts at drawing an unused game code / routing key before giving up
    pub max_code_attempts: u32,
    pub bind_addr: SocketAddr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            allow_late_join: false,
            storage_timeout: Duration::from_secs(5),
            max_code_attempts: 50,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 7492)),
        }
    }
}

impl EngineConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allow_late_join = std::env::var("ALLOW_LATE_JOIN")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(defaults.allow_late_join);

        let storage_timeout = std::env::var("STORAGE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.storage_timeout);

        let max_code_attempts = std::env::var("MAX_CODE_ATTEMPTS")
            .ok()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_code_attempts);

        let bind_addr = std::env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.bind_addr);

        if allow_late_join {
            tracing::info!("Late joins enabled - participants may join mid-game");
        }

        Self {
            allow_late_join,
            storage_timeout,
            max_code_attempts,
            bind_addr,
        }
    }
}
