//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

/// Daily close prices in strictly increasing timestamp order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    observations: Vec<PriceObservation>,
}

impl HistoricalSeries {
    /// Builds a series from observations in any order. Observations are sorted
    /// chronologically and repeated timestamps keep their first occurrence.
    pub fn from_observations(mut observations: Vec<PriceObservation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        observations.dedup_by_key(|o| o.timestamp);
        Self { observations }
    }

    /// Convenience for tests and synthetic input: one close per day ending at `end`.
    pub fn from_daily_closes(end: DateTime<Utc>, closes: &[f64]) -> Self {
        let start = end - Duration::days(closes.len().saturating_sub(1) as i64);
        let observations = closes
            .iter()
            .enumerate()
            .map(|(i, close)| PriceObservation {
                timestamp: start + Duration::days(i as i64),
                close: *close,
            })
            .collect();
        Self { observations }
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn last(&self) -> Option<&PriceObservation> {
        self.observations.last()
    }

    /// Keeps at most the last `count` observations.
    pub fn tail(&self, count: usize) -> Self {
        let skip = self.observations.len().saturating_sub(count);
        Self {
            observations: self.observations[skip..].to_vec(),
        }
    }
}

/// Forecast prices; index 0 is one day after the last historical observation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictedSeries {
    pub prices: Vec<f64>,
}

impl PredictedSeries {
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch_history(
        &self,
        symbol: &str,
        currency: &str,
        limit: u32,
    ) -> Result<HistoricalSeries>;
}

/// Current spot price lookup keyed by the provider's asset id.
#[async_trait]
pub trait SpotPriceProvider: Send + Sync {
    /// Returns `None` when the provider does not know the id.
    async fn fetch_usd_price(&self, id: &str) -> Result<Option<f64>>;
}
