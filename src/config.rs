use crate::cli::Cli;
use crate::db::Database;
use crate::llm::openai::DEFAULT_BASE_URL;
use crate::summarizer::DEFAULT_MODEL;
use tracing::debug;

pub const OPENAI_API_KEY: &str = "openai_api_key";
pub const OPENAI_BASE_URL: &str = "openai_base_url";
pub const MODEL: &str = "model";

pub const SETTING_KEYS: &[&str] = &[OPENAI_API_KEY, OPENAI_BASE_URL, MODEL];

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("Unknown setting key: {0}")]
    UnknownKey(String),
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Effective configuration: command line (or env) first, then the settings
/// store, then built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

impl AppConfig {
    pub fn resolve(cli: &Cli, db: &Database) -> Result<Self, SettingsError> {
        let api_key = match non_empty(cli.api_key.as_deref()) {
            Some(key) => Some(key),
            None => db.get_setting(OPENAI_API_KEY)?,
        };
        let base_url = match non_empty(cli.base_url.as_deref()) {
            Some(url) => url,
            None => db
                .get_setting(OPENAI_BASE_URL)?
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        };
        let model = match non_empty(cli.model.as_deref()) {
            Some(model) => model,
            None => db
                .get_setting(MODEL)?
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        };

        debug!(%base_url, %model, api_key = api_key.is_some(), "configuration resolved");
        Ok(Self {
            api_key,
            base_url,
            model,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Check a setting before it is stored.
pub fn validate_setting(key: &str, value: &str) -> Result<(), SettingsError> {
    if !SETTING_KEYS.contains(&key) {
        return Err(SettingsError::UnknownKey(key.to_string()));
    }
    let invalid = |reason: &str| SettingsError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    };
    if value.trim().is_empty() {
        return Err(invalid("value must not be empty"));
    }
    if key == OPENAI_BASE_URL && !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(invalid("expected an http:// or https:// URL"));
    }
    Ok(())
}
