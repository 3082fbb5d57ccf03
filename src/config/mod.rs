//! Configuration module for the call relay gateway
//!
//! This module handles server configuration from environment variables (with
//! `.env` loaded by the binary) and an optional YAML file.
//! Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Example
//! ```rust,no_run
//! use callrelay_gateway::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config = ServerConfig::from_file(&PathBuf::from("config.yaml"))?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::realtime::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TRANSCRIPTION_MODEL, OPENAI_REALTIME_URL, RealtimeConfig,
};
use crate::core::tasks::TaskServiceConfig;

mod yaml;

pub use yaml::{RealtimeYaml, ServerYaml, TasksYaml, TlsYaml, YamlConfig};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing the OpenAI API key. Set OPENAI_API_KEY in the environment or .env file")]
    MissingApiKey,

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("{0}")]
    Read(String),

    #[error("{0}")]
    Parse(String),
}

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    // Realtime engine
    pub openai_api_key: String,
    pub realtime_url: String,
    pub realtime_model: String,
    /// Sampling temperature passed to the engine (0.0..=2.0)
    pub temperature: f32,
    pub transcription_model: String,

    // Side-channel task service
    pub task_service_url: Option<String>,
    pub task_service_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("openai_api_key", &"[REDACTED]")
            .field("realtime_url", &self.realtime_url)
            .field("realtime_model", &self.realtime_model)
            .field("temperature", &self.temperature)
            .field("transcription_model", &self.transcription_model)
            .field("task_service_url", &self.task_service_url)
            .field(
                "task_service_token",
                &self.task_service_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Zeroize secrets when the configuration is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.openai_api_key.zeroize();
        if let Some(ref mut token) = self.task_service_token {
            token.zeroize();
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Fails if `OPENAI_API_KEY` is absent or empty, or a value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(None)
    }

    /// Load configuration from a YAML file on top of the environment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = YamlConfig::from_file(path)?;
        Self::build(Some(yaml))
    }

    fn build(yaml: Option<YamlConfig>) -> Result<Self, ConfigError> {
        let yaml = yaml.unwrap_or_default();
        let server = yaml.server.unwrap_or_default();
        let realtime = yaml.realtime.unwrap_or_default();
        let tasks = yaml.tasks.unwrap_or_default();

        let host = server
            .host
            .or_else(|| env_var("HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match server.port {
            Some(port) => port,
            None => parse_env("PORT")?.unwrap_or(DEFAULT_PORT),
        };

        let tls_yaml = server.tls.unwrap_or_default();
        let cert_path = tls_yaml.cert_path.or_else(|| env_var("TLS_CERT_PATH"));
        let key_path = tls_yaml.key_path.or_else(|| env_var("TLS_KEY_PATH"));
        let tls = match (cert_path, key_path) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: "TLS_CERT_PATH/TLS_KEY_PATH",
                    message: "both certificate and key paths are required".to_string(),
                });
            }
        };

        let openai_api_key = realtime
            .api_key
            .or_else(|| env_var("OPENAI_API_KEY"))
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let temperature = match realtime.temperature {
            Some(t) => t,
            None => parse_env("TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE),
        };
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                key: "TEMPERATURE",
                message: format!("{temperature} is outside 0.0..=2.0"),
            });
        }

        Ok(Self {
            host,
            port,
            tls,
            openai_api_key,
            realtime_url: realtime
                .url
                .or_else(|| env_var("OPENAI_REALTIME_URL"))
                .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
            realtime_model: realtime
                .model
                .or_else(|| env_var("OPENAI_REALTIME_MODEL"))
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            temperature,
            transcription_model: realtime
                .transcription_model
                .or_else(|| env_var("TRANSCRIPTION_MODEL"))
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
            task_service_url: tasks.url.or_else(|| env_var("BACKGROUND_AGENT_API_URL")),
            task_service_token: tasks
                .token
                .or_else(|| env_var("BACKGROUND_AGENT_API_TOKEN")),
        })
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Engine connection settings for one call.
    pub fn realtime_config(&self, voice: &str, instructions: String) -> RealtimeConfig {
        RealtimeConfig {
            api_key: self.openai_api_key.clone(),
            url: self.realtime_url.clone(),
            model: self.realtime_model.clone(),
            voice: Some(voice.to_string()),
            instructions: Some(instructions),
            temperature: Some(self.temperature),
            transcription_model: self.transcription_model.clone(),
        }
    }

    pub fn task_service_config(&self) -> TaskServiceConfig {
        TaskServiceConfig {
            url: self.task_service_url.clone(),
            token: self.task_service_token.clone(),
        }
    }
}

/// Non-empty environment variable.
fn env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key,
                message: format!("{raw:?}: {e}"),
            }),
        None => Ok(None),
    }
}
