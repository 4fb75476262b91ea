//! Process configuration, read once at startup.

use std::time::Duration;

/// Everything the server needs from the environment. Tests construct this
/// directly; `main` reads it from env vars with dev defaults.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    /// Bootstrap administrator credentials.
    pub admin_document: String,
    pub admin_password: String,
    /// Documents the fixed contract registry answers for (dev/test backend).
    pub contract_documents: Vec<String>,
    pub contract_lookup_timeout: Duration,
    /// Login attempts allowed per (document, source address) per rolling
    /// minute before the endpoint throttles.
    pub login_max_attempts: u32,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!("ADMIN_PASSWORD not set; using insecure dev default");
            "admin".to_string()
        });

        let contract_documents = std::env::var("CONTRACT_DOCUMENTS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let contract_lookup_timeout = std::env::var("CONTRACT_LOOKUP_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(3));

        let login_max_attempts = std::env::var("LOGIN_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(atrium_identity::rate_limit::DEFAULT_MAX_ATTEMPTS);

        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            jwt_secret,
            admin_document: std::env::var("ADMIN_DOCUMENT")
                .unwrap_or_else(|_| "0000000".to_string()),
            admin_password,
            contract_documents,
            contract_lookup_timeout,
            login_max_attempts,
        }
    }
}
