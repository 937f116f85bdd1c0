//! Core business logic abstractions

pub mod analytics;
pub mod cache;
pub mod config;
pub mod currency;
pub mod error;
pub mod forecast;
pub mod log;
pub mod price;
pub mod regression;
pub mod scaler;

// Re-export main types for cleaner imports
pub use currency::{Currency, CurrencyRateProvider};
pub use error::CoreError;
pub use price::{HistoricalSeries, HistoryProvider, PredictedSeries, SpotPriceProvider};
