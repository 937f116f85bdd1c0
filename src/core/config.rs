use crate::core::cache::CacheMode;
use crate::core::currency::Currency;
use crate::core::forecast::DEFAULT_WINDOW;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const MIN_LOOKBACK_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 365;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl ProviderConfig {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }
}

fn default_cryptocompare() -> ProviderConfig {
    ProviderConfig::new("https://min-api.cryptocompare.com")
}

fn default_coingecko() -> ProviderConfig {
    ProviderConfig::new("https://api.coingecko.com")
}

fn default_currency_api() -> ProviderConfig {
    ProviderConfig::new("https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest")
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_cryptocompare")]
    pub cryptocompare: ProviderConfig,
    #[serde(default = "default_coingecko")]
    pub coingecko: ProviderConfig,
    #[serde(default = "default_currency_api")]
    pub currency_api: ProviderConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            cryptocompare: default_cryptocompare(),
            coingecko: default_coingecko(),
            currency_api: default_currency_api(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    /// Days of history shown and used for training.
    pub lookback_days: u32,
    /// Days requested from the upstream API.
    pub limit: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            lookback_days: MAX_DAYS,
            limit: MAX_DAYS,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ForecastConfig {
    pub horizon: u32,
    pub window: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            window: DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub mode: CacheMode,
    /// Age in seconds under which a cached exchange rate is used without
    /// fetching. Zero disables rate caching.
    pub rate_max_age_secs: u64,
    /// Use an expired rate when fetching a fresh one fails.
    pub allow_stale_rate: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::Keyed,
            rate_max_age_secs: 300,
            allow_stale_rate: false,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to built-in
    /// defaults when no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "cryptocast", "cryptocast")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "cryptocast", "cryptocast")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_lookback_days(self.history.lookback_days)?;
        validate_horizon(self.forecast.horizon)?;
        if !(1..=MAX_DAYS).contains(&self.history.limit) {
            bail!("history.limit must be between 1 and {MAX_DAYS}");
        }
        if self.forecast.window == 0 {
            bail!("forecast.window must be at least 1");
        }
        Ok(())
    }
}

pub fn validate_lookback_days(days: u32) -> Result<()> {
    if !(MIN_LOOKBACK_DAYS..=MAX_DAYS).contains(&days) {
        bail!("Lookback days must be between {MIN_LOOKBACK_DAYS} and {MAX_DAYS}, got {days}");
    }
    Ok(())
}

pub fn validate_horizon(horizon: u32) -> Result<()> {
    if !(1..=MAX_DAYS).contains(&horizon) {
        bail!("Prediction horizon must be between 1 and {MAX_DAYS}, got {horizon}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: CNY
history:
  lookback_days: 90
forecast:
  horizon: 7
cache:
  mode: single_slot
  allow_stale_rate: true
providers:
  cryptocompare:
    base_url: "http://example.com/cc"
data_path: /tmp/cryptocast
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, Currency::Cny);
        assert_eq!(config.history.lookback_days, 90);
        assert_eq!(config.history.limit, 365);
        assert_eq!(config.forecast.horizon, 7);
        assert_eq!(config.forecast.window, 60);
        assert_eq!(config.cache.mode, CacheMode::SingleSlot);
        assert_eq!(config.cache.rate_max_age_secs, 300);
        assert!(config.cache.allow_stale_rate);
        assert_eq!(
            config.providers.cryptocompare.base_url,
            "http://example.com/cc"
        );
        assert_eq!(
            config.providers.coingecko.base_url,
            "https://api.coingecko.com"
        );
        assert_eq!(config.data_path.as_deref(), Some("/tmp/cryptocast"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.currency, Currency::Usd);
        assert_eq!(config.history.lookback_days, 365);
        assert_eq!(config.forecast.horizon, 30);
        assert_eq!(config.cache.mode, CacheMode::Keyed);
        assert!(!config.cache.allow_stale_rate);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let mut config = AppConfig::default();
        config.history.lookback_days = 10;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.forecast.horizon = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.forecast.horizon = 366;
        assert!(config.validate().is_err());

        assert!(validate_lookback_days(30).is_ok());
        assert!(validate_horizon(365).is_ok());
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "currency: EUR").unwrap();
        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
