use std::time::Duration;

use serde::Deserialize;

use common::config::{ConfigManager, NoConfigProvider, Validate};

pub const DEFAULT_MATCHMAKING_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_OUTBOUND_QUEUE_SIZE: usize = 64;

/// Capacity of each session's inbound event queue.
pub const SESSION_EVENT_QUEUE_SIZE: usize = 128;

/// Longest accepted input line, terminator included. A longer line closes
/// the connection.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Out-of-turn lines kept per player before further ones are discarded.
pub const PENDING_LINE_LIMIT: usize = 32;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_host: String,
    pub matchmaking_timeout_ms: u64,
    pub outbound_queue_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            matchmaking_timeout_ms: DEFAULT_MATCHMAKING_TIMEOUT.as_millis() as u64,
            outbound_queue_size: DEFAULT_OUTBOUND_QUEUE_SIZE,
        }
    }
}

impl Validate for ServerSettings {
    fn validate(&self) -> Result<(), String> {
        if self.bind_host.trim().is_empty() {
            return Err("bind_host must not be empty".to_string());
        }
        if self.matchmaking_timeout_ms == 0 {
            return Err("matchmaking_timeout_ms must be greater than 0".to_string());
        }
        if self.outbound_queue_size == 0 {
            return Err("outbound_queue_size must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl ServerSettings {
    pub fn matchmaking_timeout(&self) -> Duration {
        Duration::from_millis(self.matchmaking_timeout_ms)
    }
}

/// Loads settings from an optional YAML file; without one the defaults apply.
pub fn load_settings(config_path: Option<&str>) -> Result<ServerSettings, String> {
    match config_path {
        Some(path) => ConfigManager::<_, ServerSettings>::from_yaml_file(path).get_config(),
        None => ConfigManager::<_, ServerSettings>::new(NoConfigProvider).get_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = load_settings(None).unwrap();

        assert_eq!(settings, ServerSettings::default());
        assert_eq!(settings.matchmaking_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let settings = ServerSettings {
            matchmaking_timeout_ms: 0,
            ..ServerSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_yaml_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("tictactoe_server_{}.yaml", std::process::id()));
        std::fs::write(&path, "matchmaking_timeout_ms: 250\nbind_host: 127.0.0.1\n").unwrap();

        let settings = load_settings(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.bind_host, "127.0.0.1");
        assert_eq!(settings.matchmaking_timeout(), Duration::from_millis(250));
        assert_eq!(settings.outbound_queue_size, DEFAULT_OUTBOUND_QUEUE_SIZE);
    }
}
