use ensemble_broker::BrokerConfig;

use crate::auth::jwt::JwtConfig;

/// Default base URL that page destinations resolve under.
const DEFAULT_PAGE_BASE_URL: &str = "https://ensemble.rodeo/meta";

/// Default idle lifetime of a badge provisioning session, in seconds.
const DEFAULT_BADGE_SESSION_IDLE_SECS: u64 = 900;

/// Default number of badge sessions one identity may hold open.
const DEFAULT_BADGE_MAX_SESSIONS_PER_OWNER: usize = 3;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
    /// Base URL a badge pointing at a meta page resolves under.
    pub page_base_url: String,
    /// Badge sessions idle for longer than this are closed.
    pub badge_session_idle_secs: u64,
    /// Open badge sessions (and broker links) allowed per identity.
    pub badge_max_sessions_per_owner: usize,
    /// Broker link used by badge provisioning sessions.
    pub broker: BrokerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                       |
    /// |--------------------------------|-------------------------------|
    /// | `HOST`                         | `0.0.0.0`                     |
    /// | `PORT`                         | `3000`                        |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`       |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                          |
    /// | `PAGE_BASE_URL`                | `https://ensemble.rodeo/meta` |
    /// | `BADGE_SESSION_IDLE_SECS`      | `900`                         |
    /// | `BADGE_MAX_SESSIONS_PER_OWNER` | `3`                           |
    ///
    /// JWT and broker settings are read by [`JwtConfig::from_env`] and
    /// [`BrokerConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let page_base_url =
            std::env::var("PAGE_BASE_URL").unwrap_or_else(|_| DEFAULT_PAGE_BASE_URL.into());

        let badge_session_idle_secs: u64 = std::env::var("BADGE_SESSION_IDLE_SECS")
            .unwrap_or_else(|_| DEFAULT_BADGE_SESSION_IDLE_SECS.to_string())
            .parse()
            .expect("BADGE_SESSION_IDLE_SECS must be a valid u64");

        let badge_max_sessions_per_owner: usize = std::env::var("BADGE_MAX_SESSIONS_PER_OWNER")
            .unwrap_or_else(|_| DEFAULT_BADGE_MAX_SESSIONS_PER_OWNER.to_string())
            .parse()
            .expect("BADGE_MAX_SESSIONS_PER_OWNER must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            page_base_url,
            badge_session_idle_secs,
            badge_max_sessions_per_owner,
            broker: BrokerConfig::from_env(),
        }
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
