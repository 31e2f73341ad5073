//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that overrides `steam.api_key`.
pub const API_KEY_ENV: &str = "STEAM_API_KEY";

/// GetPlayerSummaries accepts at most this many ids per call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Steam Web API and SteamSpy access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteamConfig {
    /// Web API key (overridden by `STEAM_API_KEY`)
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_steamspy_url")]
    pub steamspy_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Pause between users, in milliseconds
    #[serde(default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Retries on rate limiting or transport errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_base_url() -> String {
    "https://api.steampowered.com".to_string()
}

fn default_steamspy_url() -> String {
    "https://steamspy.com/api.php".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_request_delay() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    3
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_api_base_url(),
            steamspy_url: default_steamspy_url(),
            timeout_seconds: default_timeout(),
            request_delay_ms: default_request_delay(),
            max_retries: default_max_retries(),
        }
    }
}

/// Steam id ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectConfig {
    /// CSV file with one steam id per row
    #[serde(default = "default_steam_ids_csv")]
    pub steam_ids_csv: PathBuf,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Column holding the steam id
    #[serde(default)]
    pub id_column: usize,

    #[serde(default = "default_true")]
    pub has_header: bool,
}

fn default_steam_ids_csv() -> PathBuf {
    PathBuf::from("./steam_ids.csv")
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            steam_ids_csv: default_steam_ids_csv(),
            batch_size: default_batch_size(),
            id_column: 0,
            has_header: true,
        }
    }
}

/// Dataset export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    #[serde(default = "default_output_csv")]
    pub output_csv: PathBuf,

    /// Also write a Parquet copy next to the CSV
    #[serde(default)]
    pub write_parquet: bool,
}

fn default_output_csv() -> PathBuf {
    PathBuf::from("./output/steam_dataset.csv")
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            output_csv: default_output_csv(),
            write_parquet: false,
        }
    }
}

/// Community group member discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_group_url")]
    pub group_url: String,

    #[serde(default = "default_page")]
    pub start_page: u32,

    #[serde(default = "default_page")]
    pub end_page: u32,

    /// Visit this many distinct random pages of the range instead of all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_pages: Option<usize>,

    /// Pause between member pages, in milliseconds
    #[serde(default = "default_request_delay")]
    pub page_delay_ms: u64,

    /// Resolved ids are appended here
    #[serde(default = "default_steam_ids_csv")]
    pub steam_ids_file: PathBuf,

    /// Profile links that could not be resolved
    #[serde(default = "default_failsafe_file")]
    pub failsafe_file: PathBuf,
}

fn default_group_url() -> String {
    "https://steamcommunity.com/groups/ukraine".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_failsafe_file() -> PathBuf {
    PathBuf::from("./failsafe.txt")
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            group_url: default_group_url(),
            start_page: default_page(),
            end_page: default_page(),
            sample_pages: None,
            page_delay_ms: default_request_delay(),
            steam_ids_file: default_steam_ids_csv(),
            failsafe_file: default_failsafe_file(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub steam: SteamConfig,

    #[serde(default)]
    pub collect: CollectConfig,

    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub scrape: ScrapeConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            steam: SteamConfig::default(),
            collect: CollectConfig::default(),
            dataset: DatasetConfig::default(),
            scrape: ScrapeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults. The API key
    /// environment variable is applied either way.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Self::default()
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            config.apply_api_key(key);
        }

        Ok(config)
    }

    /// Override the API key unless `key` is blank.
    pub fn apply_api_key(&mut self, key: String) {
        if !key.trim().is_empty() {
            self.steam.api_key = key.trim().to_string();
        }
    }

    /// Override the log level when a flag was given.
    pub fn apply_log_level(&mut self, level: Option<String>) {
        if let Some(level) = level.filter(|l| !l.trim().is_empty()) {
            self.log_level = level.trim().to_string();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.steam.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Steam timeout must be greater than 0".to_string(),
            ));
        }

        if self.collect.batch_size == 0 || self.collect.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "Batch size must be between 1 and {}",
                MAX_BATCH_SIZE
            )));
        }

        if self.scrape.start_page == 0 || self.scrape.start_page > self.scrape.end_page {
            return Err(ConfigError::ValidationError(
                "Scrape page range must start at 1 or later and not be reversed".to_string(),
            ));
        }

        if let Some(count) = self.scrape.sample_pages {
            let span = (self.scrape.end_page - self.scrape.start_page) as usize + 1;
            if count == 0 || count > span {
                return Err(ConfigError::ValidationError(format!(
                    "Page sample must be between 1 and {} (the page range size)",
                    span
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.steam.api_base_url, "https://api.steampowered.com");
        assert_eq!(config.collect.batch_size, 100);
        assert_eq!(
            config.dataset.output_csv,
            PathBuf::from("./output/steam_dataset.csv")
        );
    }

    #[test]
    fn test_steam_config_default() {
        let steam = SteamConfig::default();

        assert!(steam.api_key.is_empty());
        assert_eq!(steam.steamspy_url, "https://steamspy.com/api.php");
        assert_eq!(steam.timeout_seconds, 10);
        assert_eq!(steam.request_delay_ms, 1000);
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.steam.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_batch_size() {
        let mut config = AppConfig::default();
        config.collect.batch_size = 0;
        assert!(config.validate().is_err());

        config.collect.batch_size = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_reversed_pages() {
        let mut config = AppConfig::default();
        config.scrape.start_page = 5;
        config.scrape.end_page = 2;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_page_sample() {
        let mut config = AppConfig::default();
        config.scrape.start_page = 1;
        config.scrape.end_page = 1694;

        config.scrape.sample_pages = Some(20);
        assert!(config.validate().is_ok());

        config.scrape.sample_pages = Some(1694);
        assert!(config.validate().is_ok());

        config.scrape.sample_pages = Some(1695);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        config.scrape.sample_pages = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/tmp/steam"

[steam]
api_key = "ABC"

[collect]
batch_size = 50
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/steam"));
        assert_eq!(config.steam.api_key, "ABC");
        assert_eq!(config.steam.timeout_seconds, 10);
        assert_eq!(config.collect.batch_size, 50);
        assert!(config.collect.has_header);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[collect]\nbatch_size = 500\n").unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_apply_api_key_ignores_blank() {
        let mut config = AppConfig::default();
        config.apply_api_key("  ".to_string());
        assert!(config.steam.api_key.is_empty());

        config.apply_api_key(" KEY ".to_string());
        assert_eq!(config.steam.api_key, "KEY");
    }

    #[test]
    fn test_log_level_from_file_unless_flag_given() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "log_level = \"debug\"\n").unwrap();

        let mut config = AppConfig::from_file(&path).unwrap();
        config.apply_log_level(None);
        assert_eq!(config.log_level, "debug");

        config.apply_log_level(Some("warn".to_string()));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.scrape.group_url, parsed.scrape.group_url);
    }
}
