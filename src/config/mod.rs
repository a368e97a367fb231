//! Configuration management for mapscrape.
//!
//! Settings are resolved once at process start: dotenv files, then an
//! optional config file (given explicitly or discovered by `prefer`), then
//! environment overrides. The result is passed
//! explicitly to whatever needs it.

pub mod browser;
pub mod scrape;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub use browser::BrowserEngineConfig;
pub use scrape::{MapSelectors, ScrapeConfig};

/// Name `prefer` uses to discover `mapscrape.{toml,yaml,json}` files.
pub const APP_NAME: &str = "mapscrape";

/// Default bind address for the HTTP server.
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Dotenv files loaded before reading the environment, first wins.
const DOTENV_FILES: &[&str] = &[".env.local", ".env"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("API_KEY environment variable not set")]
    MissingApiKey,
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnv { name: String, value: String },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Shared secret expected in the `X-API-Key` header.
    /// Only read from the environment; never from the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Server bind address (port, host, or host:port).
    pub bind: Option<String>,
    pub browser: BrowserEngineConfig,
    pub scrape: ScrapeConfig,
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
}

impl Settings {
    /// Parse a config file, picking the format from its extension
    /// (TOML when there is none). Missing sections keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let parsed = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&raw).map_err(|e| e.to_string()),
            "json" => serde_json::from_str(&raw).map_err(|e| e.to_string()),
            _ => toml::from_str(&raw).map_err(|e| e.to_string()),
        };
        parsed.map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Apply environment variable overrides.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(key) = std::env::var("API_KEY") {
            if !key.is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(bind) = std::env::var("BIND_ADDRESS") {
            if !bind.is_empty() {
                self.bind = Some(bind);
            }
        }
        self.browser = self.browser.with_env_overrides()?;
        self.scrape = self.scrape.with_env_overrides()?;
        Ok(self)
    }

    /// The configured API key, or a fatal error when unset.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }

    /// Effective bind address.
    pub fn bind(&self) -> &str {
        self.bind.as_deref().unwrap_or(DEFAULT_BIND)
    }
}

/// Load dotenv files. Missing files are not an error.
pub fn load_dotenv() {
    for file in DOTENV_FILES {
        match dotenvy::from_filename(file) {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => debug!("Skipping {}: {}", file, e),
        }
    }
}

/// Find a `mapscrape` config file in the standard locations.
async fn discover_config() -> Option<PathBuf> {
    match prefer::load(APP_NAME).await {
        Ok(found) => found.source_path().map(|p| p.to_path_buf()),
        Err(_) => {
            debug!("No {} config file discovered", APP_NAME);
            None
        }
    }
}

/// Resolve settings from config file and environment.
pub async fn load_settings(options: &LoadOptions) -> Result<Settings, ConfigError> {
    let path = match &options.config_path {
        Some(p) => Some(p.clone()),
        None => discover_config().await,
    };

    let settings = match path {
        Some(p) => {
            info!("Loading config from {}", p.display());
            Settings::from_file(&p)?
        }
        None => Settings::default(),
    };

    let settings = settings.with_env_overrides()?;
    settings.scrape.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file_with_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind = "0.0.0.0:9000"

[browser]
headless = false
chrome_args = ["--lang=en-US"]

[scrape]
max_retries = 5
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.bind(), "0.0.0.0:9000");
        assert!(!settings.browser.headless);
        assert_eq!(settings.browser.chrome_args, vec!["--lang=en-US"]);
        assert_eq!(settings.scrape.max_retries, 5);
        assert_eq!(settings.scrape.no_progress_limit, 7);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_api_key_is_not_read_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"api_key = "from-file""#).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[scrape\nbroken").unwrap();

        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_yaml_and_json_files() {
        let mut yaml = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "scrape:\n  max_retries: 4\n").unwrap();
        let settings = Settings::from_file(yaml.path()).unwrap();
        assert_eq!(settings.scrape.max_retries, 4);

        let mut json = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json, r#"{{"bind": "9100"}}"#).unwrap();
        let settings = Settings::from_file(json.path()).unwrap();
        assert_eq!(settings.bind(), "9100");
    }

    #[tokio::test]
    async fn test_explicit_path_skips_discovery() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scrape]\nmax_recovery_clicks = 1").unwrap();

        let options = LoadOptions {
            config_path: Some(file.path().to_path_buf()),
        };
        let settings = load_settings(&options).await.unwrap();
        assert_eq!(settings.scrape.max_recovery_clicks, 1);
    }

    #[tokio::test]
    async fn test_explicit_missing_path_is_an_error() {
        let options = LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/mapscrape.toml")),
        };
        assert!(matches!(
            load_settings(&options).await,
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file(Path::new("/nonexistent/mapscrape.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_require_api_key() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.require_api_key(),
            Err(ConfigError::MissingApiKey)
        ));

        settings.api_key = Some(String::new());
        assert!(settings.require_api_key().is_err());

        settings.api_key = Some("secret".to_string());
        assert_eq!(settings.require_api_key().unwrap(), "secret");
    }

    #[test]
    fn test_default_bind() {
        assert_eq!(Settings::default().bind(), DEFAULT_BIND);
    }
}
