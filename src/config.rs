//! Environment-driven configuration.

use secrecy::SecretString;

use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::lang::Language;

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct Config {
    /// WhatsApp Cloud API access token; absent → dry-run messaging.
    pub access_token: Option<SecretString>,
    pub phone_number_id: Option<String>,
    pub verify_token: String,
    pub db_path: String,
    pub port: u16,
    pub default_language: Language,
    /// Anthropic API key; absent → support degrades to the knowledge base.
    pub anthropic_api_key: Option<SecretString>,
    pub responder_model: String,
    pub handoff_queue: String,
    pub app_download_url: String,
    pub support_email: String,
    pub agreement_url: String,
    pub statement_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();
        Ok(Self {
            access_token: optional("WHATSAPP_ACCESS_TOKEN").map(SecretString::from),
            phone_number_id: optional("WHATSAPP_PHONE_NUMBER_ID"),
            verify_token: optional("WEBHOOK_VERIFY_TOKEN")
                .unwrap_or_else(|| "lumo-verify-token".to_string()),
            db_path: optional("LOAN_ASSIST_DB_PATH")
                .unwrap_or_else(|| "./data/loan-assist.db".to_string()),
            port: parse_or("PORT", 8000)?,
            default_language: match optional("DEFAULT_LANGUAGE") {
                Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                    key: "DEFAULT_LANGUAGE".to_string(),
                    message: format!("unknown language '{raw}'"),
                })?,
                None => Language::En,
            },
            anthropic_api_key: optional("ANTHROPIC_API_KEY").map(SecretString::from),
            responder_model: optional("RESPONDER_MODEL")
                .unwrap_or_else(|| "claude-3-5-haiku-latest".to_string()),
            handoff_queue: optional("HANDOFF_QUEUE").unwrap_or(defaults.handoff_queue),
            app_download_url: optional("APP_DOWNLOAD_URL").unwrap_or(defaults.app_download_url),
            support_email: optional("SUPPORT_EMAIL").unwrap_or(defaults.support_email),
            agreement_url: optional("AGREEMENT_URL").unwrap_or(defaults.agreement_url),
            statement_url: optional("STATEMENT_URL").unwrap_or(defaults.statement_url),
        })
    }

    /// The engine-facing slice of the configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            default_language: self.default_language,
            handoff_queue: self.handoff_queue.clone(),
            app_download_url: self.app_download_url.clone(),
            support_email: self.support_email.clone(),
            agreement_url: self.agreement_url.clone(),
            statement_url: self.statement_url.clone(),
        }
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("could not parse '{raw}'"),
        }),
        None => Ok(default),
    }
}
