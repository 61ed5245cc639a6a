//! Configuration management for Pulse.
//!
//! Loads configuration from ${PULSE_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for Pulse configuration and data directories.
    //!
    //! PULSE_HOME resolution order:
    //! 1. PULSE_HOME environment variable (if set)
    //! 2. ~/.config/pulse (default)

    use std::path::PathBuf;

    /// Returns the Pulse home directory.
    pub fn pulse_home() -> PathBuf {
        if let Ok(home) = std::env::var("PULSE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("pulse"))
            .unwrap_or_else(|| PathBuf::from(".pulse"))
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        pulse_home().join("config.toml")
    }

    /// Returns the path to the persisted bearer token.
    pub fn token_path() -> PathBuf {
        pulse_home().join("token")
    }

    /// Returns the directory for log files.
    pub fn logs_dir() -> PathBuf {
        pulse_home().join("logs")
    }
}

/// Calendar display and export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// IANA name written into exported calendars.
    pub tzid: String,
    /// Offset of the campus time zone from UTC.
    pub utc_offset_minutes: i32,
    /// Calendar name written as X-WR-CALNAME.
    pub calendar_name: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            tzid: "Asia/Krasnoyarsk".to_string(),
            utc_offset_minutes: 7 * 60,
            calendar_name: "KemSU events".to_string(),
        }
    }
}

impl CalendarConfig {
    /// Fixed offset of the campus zone. Falls back to UTC for out-of-range values.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST API
    pub api_base_url: String,

    /// Base URL of the Socket.IO server
    pub socket_url: String,

    /// Timeout for API requests in seconds (0 disables)
    pub request_timeout_secs: u32,

    /// Debounce applied to the search box
    pub search_debounce_ms: u64,

    /// Lifetime of the pushed notification banner
    pub banner_timeout_secs: u64,

    #[serde(default)]
    pub calendar: CalendarConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
    pub const DEFAULT_SOCKET_URL: &str = "http://localhost:5000";
    const DEFAULT_SEARCH_DEBOUNCE_MS: u64 = 400;
    const DEFAULT_BANNER_TIMEOUT_SECS: u64 = 5;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Returns the effective API base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is malformed.
    pub fn effective_api_base_url(&self) -> Result<String> {
        resolve_base_url(
            Some(&self.api_base_url),
            "PULSE_API_URL",
            Self::DEFAULT_API_BASE_URL,
            "API",
        )
    }

    /// Returns the effective Socket.IO base URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is malformed.
    pub fn effective_socket_url(&self) -> Result<String> {
        resolve_base_url(
            Some(&self.socket_url),
            "PULSE_SOCKET_URL",
            Self::DEFAULT_SOCKET_URL,
            "notification server",
        )
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.request_timeout_secs)))
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn banner_timeout(&self) -> Duration {
        Duration::from_secs(self.banner_timeout_secs)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Uses the embedded template for structure/comments and merges
    /// generated values from `Config::default()` into it.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let config = Config::default();
        let generated_toml =
            toml::to_string(&config).context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;
        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            socket_url: Self::DEFAULT_SOCKET_URL.to_string(),
            request_timeout_secs: 0,
            search_debounce_ms: Self::DEFAULT_SEARCH_DEBOUNCE_MS,
            banner_timeout_secs: Self::DEFAULT_BANNER_TIMEOUT_SECS,
            calendar: CalendarConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

/// Resolves a base URL with precedence: env > config > default.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_base_url(
    config_base_url: Option<&str>,
    env_var: &str,
    default_url: &str,
    label: &str,
) -> Result<String> {
    if let Ok(env_url) = std::env::var(env_var) {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, label)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    if let Some(config_url) = config_base_url {
        let trimmed = config_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed, label)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    Ok(default_url.to_string())
}

fn validate_url(url: &str, label: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid {label} base URL: {url}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.api_base_url, Config::DEFAULT_API_BASE_URL);
        assert_eq!(config.search_debounce_ms, 400);
        assert_eq!(config.calendar.tzid, "Asia/Krasnoyarsk");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "api_base_url = \"https://pulse.example\"\n[calendar]\nutc_offset_minutes = 180\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "https://pulse.example");
        assert_eq!(config.calendar.utc_offset_minutes, 180);
        assert_eq!(config.calendar.tzid, "Asia/Krasnoyarsk");
        assert_eq!(config.banner_timeout_secs, 5);
    }

    #[test]
    fn test_template_parses_to_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.api_base_url, defaults.api_base_url);
        assert_eq!(parsed.calendar.utc_offset_minutes, defaults.calendar.utc_offset_minutes);
        assert_eq!(parsed.logging.level, defaults.logging.level);
    }

    #[test]
    fn test_generate_keeps_comments() {
        let generated = Config::generate().unwrap();
        assert!(generated.contains("# Base URL of the events REST API"));
        assert!(generated.contains("api_base_url ="));
    }

    #[test]
    fn test_init_refuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::init(&path).unwrap();
        assert!(Config::init(&path).is_err());
    }

    #[test]
    fn test_resolve_base_url_rejects_garbage() {
        let err = resolve_base_url(Some("not a url"), "PULSE_TEST_UNSET_VAR", "http://x", "API");
        assert!(err.is_err());
    }

    #[test]
    fn test_resolve_base_url_trims_trailing_slash() {
        let url = resolve_base_url(
            Some("http://localhost:5000/"),
            "PULSE_TEST_UNSET_VAR",
            "http://x",
            "API",
        )
        .unwrap();
        assert_eq!(url, "http://localhost:5000");
    }

    #[test]
    fn test_calendar_offset() {
        let calendar = CalendarConfig::default();
        assert_eq!(calendar.offset().local_minus_utc(), 7 * 3600);
    }
}
