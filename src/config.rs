use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "Lessonforge";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Hosted generation backend.
pub const PRODUCTION_API_URL: &str = "https://backend-production-60c1.up.railway.app";
/// Generation backend started locally during development.
pub const DEVELOPMENT_API_URL: &str = "http://localhost:5002";

/// Generation requests can take minutes on large material; 5 minutes is the ceiling.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

const ENV_ENVIRONMENT: &str = "LESSONFORGE_ENV";
const ENV_API_URL: &str = "LESSONFORGE_API_URL";
const ENV_TIMEOUT: &str = "LESSONFORGE_TIMEOUT_SECS";

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "lessonforge=info,warn"
}

/// Get the application data directory
/// ~/Lessonforge/ on all platforms; falls back to the working directory
/// when no home directory can be determined.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Where uploaded source material is kept.
pub fn uploads_dir() -> PathBuf {
    app_data_dir().join("uploads")
}

/// Where exported reports are written.
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}

// ═══════════════════════════════════════════════════════════
// Generator configuration
// ═══════════════════════════════════════════════════════════

/// Deployment flavour; selects the default backend URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    /// Parse a `LESSONFORGE_ENV` value. Anything unrecognised is production.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" | "local" => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn default_api_url(&self) -> &'static str {
        match self {
            Self::Production => PRODUCTION_API_URL,
            Self::Development => DEVELOPMENT_API_URL,
        }
    }
}

/// Settings handed to the generator client at construction time.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratorConfig {
    pub environment: Environment,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl GeneratorConfig {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            base_url: environment.default_api_url().to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs.max(1);
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup(ENV_ENVIRONMENT)
            .map(|v| Environment::parse(&v))
            .unwrap_or(Environment::Production);

        let mut config = Self::new(environment);

        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            config = config.with_base_url(url.trim());
        }

        match lookup(ENV_TIMEOUT).map(|t| t.trim().parse::<u64>()) {
            Some(Ok(secs)) => config = config.with_timeout_secs(secs),
            Some(Err(_)) => {
                tracing::warn!(var = ENV_TIMEOUT, "Ignoring non-numeric timeout");
            }
            None => {}
        }

        config
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new(Environment::Production)
    }
}
