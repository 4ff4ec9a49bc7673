//! Environment-derived configuration
//!
//! All services are constructed from one [`Config`] value; nothing reads
//! the environment after startup. Reading never fails; [`Config::validate`]
//! reports the first missing required variable so callers can decide
//! whether to abort or run degraded (the offline language model needs no
//! API key at all).

use serde::{Deserialize, Serialize};

use crate::error::{KindredError, Result};

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    #[default]
    Development,
    Staging,
    Production,
}

impl std::str::FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(AppEnv::Development),
            "staging" => Ok(AppEnv::Staging),
            "production" | "prod" => Ok(AppEnv::Production),
            _ => Err(format!("Unknown app environment: {}", s)),
        }
    }
}

/// Runtime configuration for all Kindred services
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Language-model API key; offline stub is used when absent
    pub openai_api_key: Option<String>,
    /// Language-model API base (e.g. "https://api.openai.com/v1")
    pub openai_base_url: String,
    /// Backend-as-a-service base URL
    pub backend_url: String,
    /// Backend anonymous key, sent as `apikey` header
    pub backend_anon_key: String,
    /// Own API base URL (auth endpoints live here)
    pub api_base_url: String,
    pub app_env: AppEnv,
}

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";

impl Config {
    /// Read configuration from the environment. Never fails; missing
    /// variables surface later through [`Config::validate`].
    pub fn from_env() -> Self {
        let app_env = std::env::var("KINDRED_APP_ENV")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        let config = Self {
            openai_api_key: std::env::var("KINDRED_OPENAI_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            openai_base_url: std::env::var("KINDRED_OPENAI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_OPENAI_BASE.to_string()),
            backend_url: std::env::var("KINDRED_BACKEND_URL").unwrap_or_default(),
            backend_anon_key: std::env::var("KINDRED_BACKEND_ANON_KEY").unwrap_or_default(),
            api_base_url: std::env::var("KINDRED_API_BASE_URL").unwrap_or_default(),
            app_env,
        };

        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Configuration incomplete");
        }

        config
    }

    /// Ensure all required variables are present, naming the first missing one
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("KINDRED_BACKEND_URL", &self.backend_url),
            ("KINDRED_BACKEND_ANON_KEY", &self.backend_anon_key),
            ("KINDRED_API_BASE_URL", &self.api_base_url),
        ] {
            if value.is_empty() {
                return Err(KindredError::Config(format!(
                    "Missing required environment variable: {}",
                    name
                )));
            }
        }
        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.app_env == AppEnv::Development
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}
