use std::path::Path;

use config::{Config, ConfigError, File};
use serde::Deserialize;

use crate::error::CallflowError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CallflowConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

/// Decoding parameters and endpoint for the hosted completion model.
///
/// The API key is not part of the file config. It is read from
/// `OPENAI_API_KEY` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            temperature: 0.25,
            max_tokens: 600,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// IANA timezone name used when rendering call and task times.
    pub timezone: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

impl DisplayConfig {
    /// Parse the configured timezone, falling back to UTC on unknown names.
    pub fn tz(&self) -> chrono_tz::Tz {
        parse_tz(&self.timezone)
    }
}

pub fn parse_tz(name: &str) -> chrono_tz::Tz {
    match name.parse::<chrono_tz::Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone = %name, "Unknown display timezone, using UTC");
            chrono_tz::UTC
        }
    }
}

impl CallflowConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .build()?;
        s.try_deserialize()
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &str) -> Result<Self, CallflowError> {
        if Path::new(path).exists() {
            Ok(Self::load(path)?)
        } else {
            tracing::info!(path = %path, "No config file found, using defaults");
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_decoding_parameters() {
        let config = CallflowConfig::default();
        assert_eq!(config.completion.model, "gpt-4o-mini");
        assert!((config.completion.temperature - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.completion.max_tokens, 600);
        assert_eq!(config.http.port, 8787);
        assert_eq!(config.display.timezone, "UTC");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = CallflowConfig::load_or_default("/nonexistent/callflow.toml").unwrap();
        assert_eq!(config.http.host, "127.0.0.1");
    }

    #[test]
    fn test_parse_tz_known_and_unknown() {
        assert_eq!(parse_tz("Europe/Berlin"), chrono_tz::Europe::Berlin);
        assert_eq!(parse_tz("Mars/Olympus"), chrono_tz::UTC);
    }
}
