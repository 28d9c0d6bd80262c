use std::time::Duration;

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Controller-wide settings, loaded from the environment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Shared secret for workspace access tokens. `None` disables auth for
    /// the whole cluster; the controller logs this loudly at startup.
    pub jwt_secret: Option<String>,

    /// Lifetime of issued access tokens.
    pub token_ttl: Duration,

    /// How long `create` waits for the readiness probe before giving up.
    pub ready_timeout: Duration,

    /// Poll interval while waiting for readiness.
    pub ready_poll_interval: Duration,

    /// Attempts for applying the resource set before create fails.
    pub apply_attempts: u32,

    /// Initial backoff between apply attempts; doubles per attempt.
    pub apply_backoff: Duration,

    /// Timeout for individual probe requests against a companion.
    pub probe_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            jwt_secret: std::env::var("WORKSPACE_JWT_SECRET").ok(),
            token_ttl: env_duration_secs("WORKSPACE_TOKEN_TTL", 3600),
            ready_timeout: env_duration_secs("WORKSPACE_READY_TIMEOUT", 30),
            ready_poll_interval: Duration::from_millis(500),
            apply_attempts: env_parse("WORKSPACE_APPLY_ATTEMPTS", 3),
            apply_backoff: Duration::from_millis(500),
            probe_timeout: env_duration_secs("WORKSPACE_PROBE_TIMEOUT", 5),
        }
    }
}

impl ControllerConfig {
    pub fn from_env() -> Self {
        Self::default()
    }
}
