//! # Bot Configuration Module
//!
//! This module defines the runtime configuration for the bot, loaded from
//! environment variables at startup (a `.env` file is honored via `dotenv`).

use anyhow::{Context, Result};
use std::env;

// Constants for bot configuration
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 600; // 10 minutes of inactivity
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Configuration structure for the bot process
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot access token
    pub bot_token: String,
    /// Base URL of the library-management API
    pub api_base_url: String,
    /// Idle timeout after which an in-progress flow is discarded, in seconds
    pub session_timeout_secs: u64,
    /// Whether expired flows trigger a notification to the user
    /// (default: expiry is silent)
    pub notify_on_timeout: bool,
    /// Timeout for outbound HTTP calls to the backend, in seconds
    pub http_timeout_secs: u64,
    /// Interval between expiry sweeps when notifications are enabled
    pub sweep_interval_secs: u64,
}

impl BotConfig {
    /// Load the configuration from environment variables.
    ///
    /// `BOT_TOKEN` and `API_URL` are required; everything else has a default.
    pub fn from_env() -> Result<Self> {
        let bot_token =
            env::var("BOT_TOKEN").context("BOT_TOKEN must be set in the environment")?;
        let api_base_url =
            env::var("API_URL").context("API_URL must be set in the environment")?;

        let session_timeout_secs = env_u64("SESSION_TIMEOUT_SECS", DEFAULT_SESSION_TIMEOUT_SECS);
        let http_timeout_secs = env_u64("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS);
        let sweep_interval_secs = env_u64("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS);

        let notify_on_timeout = env::var("NOTIFY_ON_TIMEOUT")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            bot_token,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            session_timeout_secs,
            notify_on_timeout,
            http_timeout_secs,
            sweep_interval_secs,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_u64_defaults_on_garbage() {
        std::env::set_var("KITOBXONA_TEST_U64", "not-a-number");
        assert_eq!(env_u64("KITOBXONA_TEST_U64", 42), 42);
        std::env::remove_var("KITOBXONA_TEST_U64");
        assert_eq!(env_u64("KITOBXONA_TEST_U64", 7), 7);
    }
}
