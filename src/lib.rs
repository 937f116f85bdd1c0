pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::Currency;
use crate::core::cache::{ResponseCache, Store};
use crate::core::config::{self, AppConfig};
use crate::providers::caching::CachingCurrencyRateProvider;
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::cryptocompare::CryptoCompareProvider;
use crate::providers::currency_api::CurrencyApiProvider;
use crate::store::KeyValueStore;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

const HISTORY_COLLECTION: &str = "history";
const RATES_COLLECTION: &str = "rates";

/// Overrides for a single `predict` run; unset fields fall back to config.
#[derive(Debug, Clone, Default)]
pub struct PredictOptions {
    pub symbol: String,
    pub currency: Option<Currency>,
    pub days: Option<u32>,
    pub horizon: Option<u32>,
    pub csv: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

pub enum AppCommand {
    Price {
        symbol: String,
        currency: Option<Currency>,
    },
    Predict(PredictOptions),
    ClearCache,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("cryptocast starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = KeyValueStore::open(&config.default_data_path()?);
    debug!(persistent = store.is_persistent(), "Opened cache store");

    let history_cache = ResponseCache::new(
        store.get_collection(HISTORY_COLLECTION, true),
        config.cache.mode,
    );
    let rates = store.get_collection(RATES_COLLECTION, true);

    let history_provider =
        CryptoCompareProvider::new(&config.providers.cryptocompare.base_url, history_cache);
    let spot_provider = CoinGeckoProvider::new(&config.providers.coingecko.base_url);
    let rate_provider = CachingCurrencyRateProvider::new(
        CurrencyApiProvider::new(&config.providers.currency_api.base_url),
        Arc::clone(&rates),
        chrono::Duration::seconds(config.cache.rate_max_age_secs.min(i64::MAX as u64) as i64),
        config.cache.allow_stale_rate,
    );

    match command {
        AppCommand::Price { symbol, currency } => {
            cli::price::run(
                &symbol,
                currency.unwrap_or(config.currency),
                &spot_provider,
                &rate_provider,
            )
            .await
        }
        AppCommand::Predict(options) => {
            let lookback_days = options.days.unwrap_or(config.history.lookback_days);
            config::validate_lookback_days(lookback_days)?;
            let horizon = options.horizon.unwrap_or(config.forecast.horizon);
            config::validate_horizon(horizon)?;

            let request = cli::predict::PredictRequest {
                symbol: options.symbol,
                currency: options.currency.unwrap_or(config.currency),
                limit: config.history.limit.max(lookback_days),
                lookback_days,
                horizon,
                window: config.forecast.window,
                csv: options.csv,
                pdf: options.pdf,
            };
            cli::predict::run(&request, &history_provider, &spot_provider, &rate_provider).await
        }
        AppCommand::ClearCache => {
            store.get_collection(HISTORY_COLLECTION, true).clear().await;
            rates.clear().await;
            println!("Cache cleared");
            Ok(())
        }
    }
}
