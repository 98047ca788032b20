//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/storefront/config.toml)
//! 3. Environment variables (STOREFRONT_* prefix)
//!
//! Environment variables take precedence over config file values.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable prefix
const ENV_PREFIX: &str = "STOREFRONT";

/// Default HTTP timeout for backend and email calls
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which remote store adapter to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hosted database over HTTP
    Live,
    /// In-process tables persisted under `data_dir`
    #[default]
    Mock,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Live => f.write_str("live"),
            Backend::Mock => f.write_str("mock"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(Backend::Live),
            "mock" => Ok(Backend::Mock),
            other => bail!("Unknown backend '{}'. Use 'live' or 'mock'.", other),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for local data (mock tables, logs)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Remote store adapter
    #[serde(default)]
    pub backend: Backend,

    /// Hosted database project URL
    #[serde(default)]
    pub backend_url: Option<String>,

    /// Hosted database API key
    #[serde(default)]
    pub backend_key: Option<String>,

    /// Timeout for remote calls, in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Authenticated operator user id, used for role lookup
    #[serde(default)]
    pub user_id: Option<String>,

    /// Email API base URL
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,

    /// Email API key
    #[serde(default)]
    pub email_api_key: Option<String>,

    /// Sender address for outgoing mail
    #[serde(default = "default_email_from")]
    pub email_from: String,

    /// Where new-subscriber alerts go
    #[serde(default)]
    pub operator_email: Option<String>,

    /// Store name used in email templates
    #[serde(default = "default_store_name")]
    pub store_name: String,

    /// Currency symbol used when displaying prices
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Address the ingress server listens on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Log file path (logs go to stderr when unset)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: Backend::default(),
            backend_url: None,
            backend_key: None,
            request_timeout_secs: default_timeout_secs(),
            user_id: None,
            email_api_url: default_email_api_url(),
            email_api_key: None,
            email_from: default_email_from(),
            operator_email: None,
            store_name: default_store_name(),
            currency_symbol: default_currency_symbol(),
            listen_addr: default_listen_addr(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (STOREFRONT_BACKEND, STOREFRONT_BACKEND_URL, ...)
    /// 2. Config file (~/.config/storefront/config.toml or STOREFRONT_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring a path given on the command line
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &PathBuf) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides()?;
        config.ensure_data_dir()?;
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(val) = env_var("DATA_DIR") {
            self.data_dir = PathBuf::from(val);
        }

        if let Some(val) = env_var("BACKEND") {
            self.backend = val
                .parse()
                .with_context(|| format!("Invalid {}_BACKEND", ENV_PREFIX))?;
        }

        if let Some(val) = env_var("BACKEND_URL") {
            self.backend_url = non_empty(val);
        }

        if let Some(val) = env_var("BACKEND_KEY") {
            self.backend_key = non_empty(val);
        }

        if let Some(val) = env_var("USER_ID") {
            self.user_id = non_empty(val);
        }

        if let Some(val) = env_var("EMAIL_API_KEY") {
            self.email_api_key = non_empty(val);
        }

        if let Some(val) = env_var("OPERATOR_EMAIL") {
            self.operator_email = non_empty(val);
        }

        if let Some(val) = env_var("LISTEN_ADDR") {
            self.listen_addr = val;
        }

        Ok(())
    }

    /// Ensure data directory exists
    fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)
                .with_context(|| format!("Failed to create data directory: {:?}", self.data_dir))?;
        }
        Ok(())
    }

    /// Save configuration to the default file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with STOREFRONT_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Some(path) = env_var("CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("storefront")
            .join("config.toml")
    }

    /// Timeout for remote calls
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Path of the JSON file backing a mock table
    pub fn mock_table_path(&self, table: &str) -> PathBuf {
        self.data_dir.join("mock").join(format!("{}.json", table))
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{}_{}", ENV_PREFIX, suffix)).ok()
}

fn non_empty(val: String) -> Option<String> {
    if val.is_empty() {
        None
    } else {
        Some(val)
    }
}

/// Get the default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("storefront")
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_email_api_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_email_from() -> String {
    "Storefront <onboarding@resend.dev>".to_string()
}

fn default_store_name() -> String {
    "Storefront".to_string()
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_listen_addr() -> String {
    "127.0.0.1:8787".to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to serialize tests that touch environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Guard that locks env access and saves/restores env vars
    pub(crate) struct EnvGuard<'a> {
        _lock: std::sync::MutexGuard<'a, ()>,
        saved: Vec<(String, Option<String>)>,
    }

    impl<'a> EnvGuard<'a> {
        pub(crate) fn new(vars: &[&str]) -> Self {
            let lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
            let saved = vars
                .iter()
                .map(|&name| (name.to_string(), env::var(name).ok()))
                .collect();
            for name in vars {
                env::remove_var(name);
            }
            Self { _lock: lock, saved }
        }
    }

    impl Drop for EnvGuard<'_> {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }

    pub(crate) const ENV_VARS: &[&str] = &[
        "STOREFRONT_DATA_DIR",
        "STOREFRONT_BACKEND",
        "STOREFRONT_BACKEND_URL",
        "STOREFRONT_BACKEND_KEY",
        "STOREFRONT_USER_ID",
        "STOREFRONT_EMAIL_API_KEY",
        "STOREFRONT_OPERATOR_EMAIL",
        "STOREFRONT_LISTEN_ADDR",
        "STOREFRONT_CONFIG",
    ];

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Mock);
        assert!(config.backend_url.is_none());
        assert!(config.data_dir.ends_with("storefront"));
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_mock_table_path() {
        let config = Config::default();
        let path = config.mock_table_path("products");
        assert!(path.ends_with("mock/products.json"));
    }

    #[test]
    fn test_env_override_backend() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();

        env::set_var("STOREFRONT_BACKEND", "live");
        env::set_var("STOREFRONT_BACKEND_URL", "https://shop.example.co");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.backend, Backend::Live);
        assert_eq!(config.backend_url.as_deref(), Some("https://shop.example.co"));

        // Empty string clears it
        env::set_var("STOREFRONT_BACKEND_URL", "");
        config.apply_env_overrides().unwrap();
        assert!(config.backend_url.is_none());
    }

    #[test]
    fn test_env_override_rejects_unknown_backend() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();

        env::set_var("STOREFRONT_BACKEND", "firebase");
        assert!(config.apply_env_overrides().is_err());
    }

    #[test]
    fn test_env_override_data_dir() {
        let _guard = EnvGuard::new(ENV_VARS);
        let mut config = Config::default();

        env::set_var("STOREFRONT_DATA_DIR", "/tmp/storefront-test");
        config.apply_env_overrides().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/storefront-test"));
    }

    #[test]
    fn test_load_from_str() {
        let _guard = EnvGuard::new(ENV_VARS);

        let toml = r#"
            data_dir = "/custom/data"
            backend = "live"
            backend_url = "https://shop.example.co"
            currency_symbol = "$"
        "#;

        let config = Config::load_from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.backend, Backend::Live);
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.store_name, "Storefront");
    }

    #[test]
    fn test_save_and_reload() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = Config {
            data_dir: temp_dir.path().join("data"),
            operator_email: Some("owner@example.com".to_string()),
            ..Config::default()
        };
        config.save_to_path(&path).unwrap();

        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded.operator_email, config.operator_email);
        assert!(loaded.data_dir.exists());
    }

    #[test]
    fn test_load_from_path_missing_file() {
        let _guard = EnvGuard::new(ENV_VARS);
        let temp_dir = tempfile::TempDir::new().unwrap();
        env::set_var("STOREFRONT_DATA_DIR", temp_dir.path());

        let path = PathBuf::from("/nonexistent/config.toml");
        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.backend, Backend::Mock);
        assert!(config.backend_url.is_none());
    }

    #[test]
    fn test_backend_parse() {
        assert_eq!("LIVE".parse::<Backend>().unwrap(), Backend::Live);
        assert_eq!(Backend::Mock.to_string(), "mock");
        assert!("other".parse::<Backend>().is_err());
    }
}
