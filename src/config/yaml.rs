use serde::Deserialize;
use std::path::Path;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional; anything present overrides the environment.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 5050
///   tls:
///     cert_path: "/etc/relay/cert.pem"
///     key_path: "/etc/relay/key.pem"
///
/// realtime:
///   api_key: "sk-..."
///   url: "wss://api.openai.com/v1/realtime"
///   model: "gpt-realtime"
///   temperature: 0.8
///   transcription_model: "whisper-1"
///
/// tasks:
///   url: "https://agents.example.com/api/tasks"
///   token: "bearer-token"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub tasks: Option<TasksYaml>,
}

/// Server configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls: Option<TlsYaml>,
}

/// TLS configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

/// Realtime engine configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub transcription_model: Option<String>,
}

/// Task service configuration from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TasksYaml {
    pub url: Option<String>,
    pub token: Option<String>,
}

impl YamlConfig {
    /// Load a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Read(format!("Failed to read config file {}: {e}", path.display()))
        })?;

        serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_yaml_config_full() {
        let yaml = r#"
server:
  host: "127.0.0.1"
  port: 8080
  tls:
    cert_path: "/tmp/cert.pem"
    key_path: "/tmp/key.pem"
realtime:
  api_key: "sk-yaml"
  model: "gpt-realtime-mini"
  temperature: 0.6
tasks:
  url: "https://tasks.example.com"
  token: "tok"
"#;
        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        let server = config.server.unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(8080));
        assert_eq!(server.tls.unwrap().key_path.as_deref(), Some("/tmp/key.pem"));

        let realtime = config.realtime.unwrap();
        assert_eq!(realtime.api_key.as_deref(), Some("sk-yaml"));
        assert_eq!(realtime.model.as_deref(), Some("gpt-realtime-mini"));
        assert_eq!(realtime.temperature, Some(0.6));
        assert!(realtime.url.is_none());

        let tasks = config.tasks.unwrap();
        assert_eq!(tasks.url.as_deref(), Some("https://tasks.example.com"));
        assert_eq!(tasks.token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_yaml_config_empty() {
        let config: YamlConfig = serde_yaml::from_str("{}").unwrap();
        assert!(config.server.is_none());
        assert!(config.realtime.is_none());
        assert!(config.tasks.is_none());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        fs::write(&config_path, "server:\n  host: \"localhost\"\n  port: 3000\n").unwrap();

        let config = YamlConfig::from_file(&config_path).unwrap();
        assert_eq!(
            config.server.as_ref().unwrap().host,
            Some("localhost".to_string())
        );
        assert_eq!(config.server.as_ref().unwrap().port, Some(3000));
    }

    #[test]
    fn test_from_file_not_found() {
        let path = PathBuf::from("/nonexistent/config.yaml");
        let result = YamlConfig::from_file(&path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: content:").unwrap();

        let result = YamlConfig::from_file(&config_path);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse YAML")
        );
    }
}
