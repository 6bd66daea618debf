//! Configuration for the authorization server.

use std::time::Duration;

use anyhow::Context;

/// Credential lifetimes and store timing constants.
pub mod lifetimes {
    use std::time::Duration;

    /// Authorization code lifetime (10 minutes).
    pub const AUTH_CODE: Duration = Duration::from_secs(600);

    /// Access token lifetime (1 hour).
    pub const ACCESS_TOKEN: Duration = Duration::from_secs(3600);

    /// Refresh token lifetime (30 days).
    pub const REFRESH_TOKEN: Duration = Duration::from_secs(30 * 24 * 3600);

    /// Interval between background sweeps of expired credentials (5 minutes).
    pub const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

    /// Upper bound on a single store operation.
    pub const STORE_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Default issuer used when none is configured.
pub const DEFAULT_ISSUER: &str = "http://localhost:8000";

/// Header carrying the resource owner id, set by the fronting login component.
pub const DEFAULT_USER_HEADER: &str = "x-authenticated-user";

/// Requests served at once across all routes before callers queue.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1024;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Issuer identifier and base URL for endpoint announcements.
    pub issuer: String,

    /// Lifetime of issued authorization codes.
    pub auth_code_ttl: Duration,

    /// Lifetime of issued access tokens.
    pub access_token_ttl: Duration,

    /// Lifetime of issued refresh tokens.
    pub refresh_token_ttl: Duration,

    /// Background sweep interval. `None` disables the sweeper; expiry is
    /// still enforced lazily on every read.
    pub sweep_interval: Option<Duration>,

    /// Upper bound on a single store operation before it is reported as
    /// `server_error`.
    pub store_timeout: Duration,

    /// Request header holding the authenticated user id on `/authorize`.
    pub user_header: String,

    /// Requests the HTTP binding serves at once, shared by every route.
    pub max_in_flight: usize,
}

impl Config {
    /// Create a configuration with default lifetimes for the given issuer.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into().trim_end_matches('/').to_string(),
            auth_code_ttl: lifetimes::AUTH_CODE,
            access_token_ttl: lifetimes::ACCESS_TOKEN,
            refresh_token_ttl: lifetimes::REFRESH_TOKEN,
            sweep_interval: Some(lifetimes::SWEEP_INTERVAL),
            store_timeout: lifetimes::STORE_TIMEOUT,
            user_header: DEFAULT_USER_HEADER.to_string(),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    /// Create a test configuration: default lifetimes, no background sweep.
    #[must_use]
    pub fn for_testing() -> Self {
        Self { sweep_interval: None, ..Self::new("https://auth.example.test") }
    }

    /// Create configuration from environment variables.
    ///
    /// Reads `AUTHZ_ISSUER`, `AUTHZ_AUTH_CODE_TTL_SECS`,
    /// `AUTHZ_ACCESS_TOKEN_TTL_SECS`, `AUTHZ_REFRESH_TOKEN_TTL_SECS`,
    /// `AUTHZ_SWEEP_INTERVAL_SECS` (0 disables the sweeper),
    /// `AUTHZ_USER_HEADER` and `AUTHZ_MAX_IN_FLIGHT`.
    ///
    /// # Errors
    ///
    /// Returns error if a duration variable is not a whole number of seconds
    /// or the in-flight limit is not a positive integer.
    pub fn from_env() -> anyhow::Result<Self> {
        let issuer = std::env::var("AUTHZ_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string());
        let mut config = Self::new(issuer);

        if let Some(ttl) = env_secs("AUTHZ_AUTH_CODE_TTL_SECS")? {
            config.auth_code_ttl = ttl;
        }
        if let Some(ttl) = env_secs("AUTHZ_ACCESS_TOKEN_TTL_SECS")? {
            config.access_token_ttl = ttl;
        }
        if let Some(ttl) = env_secs("AUTHZ_REFRESH_TOKEN_TTL_SECS")? {
            config.refresh_token_ttl = ttl;
        }
        if let Some(interval) = env_secs("AUTHZ_SWEEP_INTERVAL_SECS")? {
            config.sweep_interval = (!interval.is_zero()).then_some(interval);
        }
        if let Ok(header) = std::env::var("AUTHZ_USER_HEADER") {
            config.user_header = header.to_ascii_lowercase();
        }
        if let Ok(raw) = std::env::var("AUTHZ_MAX_IN_FLIGHT") {
            config.max_in_flight = raw
                .trim()
                .parse()
                .ok()
                .filter(|limit| *limit > 0)
                .context("AUTHZ_MAX_IN_FLIGHT must be a positive integer")?;
        }

        Ok(config)
    }

    /// Access token lifetime as reported in `expires_in`.
    #[must_use]
    pub const fn access_token_expires_in(&self) -> u64 {
        self.access_token_ttl.as_secs()
    }

    /// Absolute URL of an endpoint under the issuer.
    #[must_use]
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.issuer, path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ISSUER)
    }
}

fn env_secs(name: &str) -> anyhow::Result<Option<Duration>> {
    match std::env::var(name) {
        Ok(raw) => {
            let secs: u64 =
                raw.trim().parse().with_context(|| format!("{name} must be a number of seconds"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
        Err(_) => Ok(None),
    }
}
