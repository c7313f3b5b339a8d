//! Configuration System
//!
//! Layered configuration for the relay: built-in defaults, then an optional
//! TOML file, then `ANALYTICS_RELAY_*` environment overrides. Nested keys use a
//! double underscore, e.g. `ANALYTICS_RELAY_SESSION__ID_KEY`.
//!
//! The `config` crate lowercases table keys, so `[global_parameters]` is read
//! a second time straight from the TOML text to keep keys as written.
//! Environment overrides for global parameters arrive lowercased and replace
//! file keys that match ignoring case.

use crate::error::ApiError;
use crate::event::{ParameterMap, Value};
use crate::interceptor::session::{SessionKeys, DEFAULT_SESSION_DURATION_KEY, DEFAULT_SESSION_ID_KEY};
use crate::logging::LoggingConfig;
use config::builder::DefaultState;
use chrono::{DateTime, Utc};
use config::{Config, ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ANALYTICS_RELAY";

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Master switch for track / identify / set_user_property
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Emit diagnostic events from the manager
    #[serde(default)]
    pub logging_enabled: bool,

    #[serde(default)]
    pub session: SessionConfig,

    /// Parameters merged into every event that lacks them
    #[serde(default)]
    pub global_parameters: ParameterMap,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session interceptor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Install a session interceptor at the head of the chain
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_id_key")]
    pub id_key: String,

    #[serde(default = "default_duration_key")]
    pub duration_key: String,
}

/// Event-name filter settings. Deny wins over allow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub allow: Vec<String>,

    #[serde(default)]
    pub deny: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_id_key() -> String {
    DEFAULT_SESSION_ID_KEY.to_string()
}

fn default_duration_key() -> String {
    DEFAULT_SESSION_DURATION_KEY.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            id_key: default_id_key(),
            duration_key: default_duration_key(),
        }
    }
}

impl SessionConfig {
    pub fn keys(&self) -> SessionKeys {
        SessionKeys {
            id_key: self.id_key.clone(),
            duration_key: self.duration_key.clone(),
        }
    }
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.allow.is_empty() && self.deny.is_empty()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logging_enabled: false,
            session: SessionConfig::default(),
            global_parameters: ParameterMap::new(),
            filter: FilterConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Session(String),
    Filter(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Session(msg) => write!(f, "Session: {}", msg),
            ValidationError::Filter(msg) => write!(f, "Filter: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RelayConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.session.id_key.trim().is_empty() {
            errors.push(ValidationError::Session("id_key cannot be empty".to_string()));
        }
        if self.session.duration_key.trim().is_empty() {
            errors.push(ValidationError::Session(
                "duration_key cannot be empty".to_string(),
            ));
        }
        if self.session.id_key == self.session.duration_key {
            errors.push(ValidationError::Session(format!(
                "id_key and duration_key must differ (both '{}')",
                self.session.id_key
            )));
        }

        for name in &self.filter.allow {
            if self.filter.deny.contains(name) {
                errors.push(ValidationError::Filter(format!(
                    "'{}' is in both allow and deny",
                    name
                )));
            }
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding all errors into one `ApiError`.
    pub fn validated(self) -> Result<Self, ApiError> {
        self.validate().map_err(|errors| {
            let error_msgs: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                error_msgs.join("\n")
            ))
        })?;
        Ok(self)
    }
}

/// Loads `RelayConfig` from defaults, files, and the environment.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, then `path` if given, then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<RelayConfig, ApiError> {
        let mut builder = builder_with_defaults()?;
        if let Some(path) = path {
            builder = add_file(builder, path)?;
        }
        let mut config = builder
            .add_source(env_source())
            .build()?
            .try_deserialize::<RelayConfig>()?;

        let file_parameters = match path {
            Some(path) => global_parameters_from_toml(&fs::read_to_string(path)?)?,
            None => ParameterMap::new(),
        };
        config.global_parameters = overlay_parameters(file_parameters, env_global_parameters()?);
        config.validated()
    }

    /// Defaults then `path`, ignoring the environment.
    pub fn load_from_file(path: &Path) -> Result<RelayConfig, ApiError> {
        let builder = add_file(builder_with_defaults()?, path)?;
        let mut config = builder.build()?.try_deserialize::<RelayConfig>()?;
        config.global_parameters = global_parameters_from_toml(&fs::read_to_string(path)?)?;
        config.validated()
    }

    /// Defaults then an inline TOML document.
    pub fn load_from_str(text: &str) -> Result<RelayConfig, ApiError> {
        let mut config = builder_with_defaults()?
            .add_source(File::from_str(text, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<RelayConfig>()?;
        config.global_parameters = global_parameters_from_toml(text)?;
        config.validated()
    }
}

/// Create a Config builder with defaults applied.
fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
    Config::builder()
        .set_default("enabled", true)?
        .set_default("logging_enabled", false)?
        .set_default("session.enabled", true)?
        .set_default("session.id_key", DEFAULT_SESSION_ID_KEY)?
        .set_default("session.duration_key", DEFAULT_SESSION_DURATION_KEY)
}

fn add_file(
    builder: ConfigBuilder<DefaultState>,
    path: &Path,
) -> Result<ConfigBuilder<DefaultState>, ApiError> {
    if !path.exists() {
        return Err(ApiError::ConfigError(format!(
            "Config file not found: {}",
            path.display()
        )));
    }
    Ok(builder.add_source(File::from(path).format(config::FileFormat::Toml)))
}

/// Read `[global_parameters]` from TOML text with key case preserved.
fn global_parameters_from_toml(text: &str) -> Result<ParameterMap, ApiError> {
    let document = toml::from_str::<toml::Table>(text)
        .map_err(|e| ApiError::ConfigError(format!("Invalid TOML: {}", e)))?;
    let Some(section) = document.get("global_parameters") else {
        return Ok(ParameterMap::new());
    };
    let table = section
        .as_table()
        .ok_or_else(|| ApiError::ConfigError("global_parameters must be a table".to_string()))?;

    table
        .iter()
        .map(|(key, value)| parameter_from_toml(key, value).map(|value| (key.clone(), value)))
        .collect()
}

fn parameter_from_toml(key: &str, value: &toml::Value) -> Result<Value, ApiError> {
    match value {
        toml::Value::String(s) => Ok(Value::String(s.clone())),
        toml::Value::Integer(i) => Ok(Value::Int(*i)),
        toml::Value::Float(f) => Ok(Value::Float(*f)),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        // Offset datetimes become dates; local dates and times stay text.
        toml::Value::Datetime(datetime) => {
            let text = datetime.to_string();
            Ok(match DateTime::parse_from_rfc3339(&text) {
                Ok(parsed) => Value::Date(parsed.with_timezone(&Utc)),
                Err(_) => Value::String(text),
            })
        }
        toml::Value::Array(_) | toml::Value::Table(_) => Err(ApiError::ConfigError(format!(
            "global parameter '{}' must be a scalar value",
            key
        ))),
    }
}

/// Global parameters set through `ANALYTICS_RELAY_GLOBAL_PARAMETERS__*`.
fn env_global_parameters() -> Result<ParameterMap, ApiError> {
    let env = Config::builder().add_source(env_source()).build()?;
    match env.get::<ParameterMap>("global_parameters") {
        Ok(parameters) => Ok(parameters),
        Err(config::ConfigError::NotFound(_)) => Ok(ParameterMap::new()),
        Err(e) => Err(e.into()),
    }
}

/// Apply lowercased environment keys over file keys that match ignoring case.
fn overlay_parameters(mut file: ParameterMap, env: ParameterMap) -> ParameterMap {
    for (key, value) in env {
        let matching: Vec<String> = file
            .keys()
            .filter(|existing| existing.to_lowercase() == key)
            .cloned()
            .collect();
        if matching.is_empty() {
            file.insert(key, value);
        } else {
            for existing in matching {
                file.insert(existing, value.clone());
            }
        }
    }
    file
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
