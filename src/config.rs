use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Name of the environment variable holding the OpenRouter key.
pub const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_APP_NAME: &str = "RecipeChat";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;
pub const DEFAULT_STORE_PATH: &str = "recipes.json";

#[derive(Debug, thiserror::Error)]
#[error("invalid value '{value}' for {key}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
}

/// Settings for the generative backend client.
///
/// Only the name of the variable holding the API key is kept. The key is
/// read when a call is made.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub api_key_env_var: String,
    pub model: String,
    pub base_url: String,
    pub site_url: String,
    pub app_name: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_key_env_var: API_KEY_ENV_VAR.to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            site_url: DEFAULT_SITE_URL.to_string(),
            app_name: DEFAULT_APP_NAME.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl BackendConfig {
    /// Reads `.env` and the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Ok(Self {
            api_key_env_var: defaults.api_key_env_var,
            model: env_or("RECIPE_MODEL", defaults.model),
            base_url: env_or("OPENROUTER_BASE_URL", defaults.base_url),
            site_url: env_or("SITE_URL", defaults.site_url),
            app_name: env_or("APP_NAME", defaults.app_name),
            temperature: env_parsed("RECIPE_TEMPERATURE", defaults.temperature)?,
            max_tokens: env_parsed("RECIPE_MAX_TOKENS", defaults.max_tokens)?,
        })
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub store_path: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = BackendConfig::from_env()?;
        let store_path = PathBuf::from(env_or("RECIPE_STORE_PATH", DEFAULT_STORE_PATH.to_string()));
        Ok(Self { backend, store_path })
    }
}

fn env_or(key: &str, default: String) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn env_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    parse_or(key, env::var(key).ok(), default)
}

/// Parses `raw` when it holds a non-blank value.
fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| ConfigError {
            key: key.to_string(),
            value: raw,
        }),
        _ => Ok(default),
    }
}
