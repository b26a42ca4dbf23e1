//! Load configuration via `config` crate with env-override support.

use std::{ops::Deref, sync::Arc};

use serde::Deserialize;

use super::types::Res;

/// Default OpenAI model to use.
fn default_openai_model() -> String {
    "gpt-4.1-mini".to_string()
}

/// Default sampling temperature for OpenAI completions.
fn default_openai_temperature() -> f32 {
    0.12
}

/// Default max output tokens for OpenAI model.
fn default_openai_max_tokens() -> u32 {
    2048
}

/// Default timeout for a single completion call.
fn default_openai_timeout_secs() -> u64 {
    120
}

/// Default SurrealDB namespace.
fn default_db_namespace() -> String {
    "relay".to_string()
}

/// Default SurrealDB database.
fn default_db_database() -> String {
    "bot".to_string()
}

/// Default number of past turns rendered into a prompt.
fn default_history_max_turns() -> usize {
    20
}

/// Default bound on stored prompt / completion length.
fn default_max_field_chars() -> usize {
    500
}

/// Configuration for the relay-bot application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The shared settings.
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The settings themselves, read through `Config`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI model to use (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature to use for the OpenAI model (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2. Lower values make the output more deterministic.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Max output tokens for OpenAI model (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Seconds to wait for a completion before giving up (`OPENAI_TIMEOUT_SECS`).
    #[serde(default = "default_openai_timeout_secs")]
    pub openai_timeout_secs: u64,
    /// Slack app token (`SLACK_APP_TOKEN`).
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Optional bot user ID override (`SLACK_BOT_USER_ID`).
    ///
    /// When unset, the ID is looked up with `auth.test` at startup.
    #[serde(default)]
    pub slack_bot_user_id: Option<String>,
    /// Database endpoint URL (`DB_ENDPOINT`), e.g. `ws://localhost:8000` or `mem://`.
    pub db_endpoint: String,
    /// Database username (`DB_USERNAME`).
    #[serde(default)]
    pub db_username: String,
    /// Database password (`DB_PASSWORD`).
    #[serde(default)]
    pub db_password: String,
    /// Database namespace (`DB_NAMESPACE`).
    #[serde(default = "default_db_namespace")]
    pub db_namespace: String,
    /// Database name (`DB_DATABASE`).
    #[serde(default = "default_db_database")]
    pub db_database: String,
    /// Number of most recent turns rendered into each prompt (`HISTORY_MAX_TURNS`).
    /// Zero means the whole channel history is used.
    #[serde(default = "default_history_max_turns")]
    pub history_max_turns: usize,
    /// Maximum number of characters stored per prompt or completion (`MAX_FIELD_CHARS`).
    #[serde(default = "default_max_field_chars")]
    pub max_field_chars: usize,
}

impl ConfigInner {
    /// Settings suitable for tests and local runs against the in-memory store.
    ///
    /// Credentials are left empty.
    pub fn local() -> Self {
        Self {
            openai_model: default_openai_model(),
            openai_temperature: default_openai_temperature(),
            openai_max_tokens: default_openai_max_tokens(),
            openai_timeout_secs: default_openai_timeout_secs(),
            db_endpoint: "mem://".to_string(),
            db_namespace: default_db_namespace(),
            db_database: default_db_database(),
            history_max_turns: default_history_max_turns(),
            max_field_chars: default_max_field_chars(),
            ..Default::default()
        }
    }
}

impl From<ConfigInner> for Config {
    fn from(inner: ConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

impl Config {
    /// Load from `RELAY_BOT_*` environment variables, plus a TOML file when one is given or found.
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("RELAY_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if self.openai_timeout_secs == 0 {
            return Err(anyhow::anyhow!("OpenAI timeout must be at least one second."));
        }

        if self.max_field_chars == 0 {
            return Err(anyhow::anyhow!("Max field chars must be greater than zero."));
        }

        Ok(())
    }
}

// Tests.
