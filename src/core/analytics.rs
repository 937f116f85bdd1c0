//! Builds the rows and statistics shown to the user from fetched and
//! predicted prices.
use crate::core::currency::{Currency, convert, convert_all};
use crate::core::price::{HistoricalSeries, PredictedSeries};
use chrono::{Duration, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Historical,
    Predicted,
}

impl Segment {
    pub fn label(&self) -> &'static str {
        match self {
            Segment::Historical => "Historical",
            Segment::Predicted => "Predicted",
        }
    }
}

/// One day of prices, in USD and in the display currency.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub segment: Segment,
    pub day: usize,
    pub date: Option<NaiveDate>,
    pub price_usd: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStatistics {
    pub mean: f64,
    pub median: f64,
    pub max: f64,
    pub min: f64,
}

impl PriceStatistics {
    /// Returns `None` for an empty slice.
    pub fn from_prices(prices: &[f64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        let mut sorted = prices.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            median,
            max: sorted[sorted.len() - 1],
            min: sorted[0],
        })
    }
}

/// Everything one `predict` run produces, prices kept in USD.
#[derive(Debug, Clone)]
pub struct PriceReport {
    pub symbol: String,
    pub currency: Currency,
    pub rate: f64,
    pub spot_usd: Option<f64>,
    pub historical: HistoricalSeries,
    pub predicted: PredictedSeries,
}

impl PriceReport {
    pub fn spot(&self) -> Option<f64> {
        self.spot_usd.map(|p| convert(p, self.rate))
    }

    pub fn historical_rows(&self) -> Vec<PriceRow> {
        let converted = convert_all(&self.historical.closes(), self.rate);
        self.historical
            .observations()
            .iter()
            .zip(converted)
            .enumerate()
            .map(|(i, (o, price))| PriceRow {
                segment: Segment::Historical,
                day: i + 1,
                date: Some(o.timestamp.date_naive()),
                price_usd: o.close,
                price,
            })
            .collect()
    }

    pub fn predicted_rows(&self) -> Vec<PriceRow> {
        let converted = convert_all(&self.predicted.prices, self.rate);
        let after = self.historical.last().map(|o| o.timestamp.date_naive());
        self.predicted
            .prices
            .iter()
            .zip(converted)
            .enumerate()
            .map(|(i, (usd, price))| PriceRow {
                segment: Segment::Predicted,
                day: i + 1,
                date: after.map(|d| d + Duration::days(i as i64 + 1)),
                price_usd: *usd,
                price,
            })
            .collect()
    }

    /// Historical rows followed by predicted rows.
    pub fn all_rows(&self) -> Vec<PriceRow> {
        let mut rows = self.historical_rows();
        rows.extend(self.predicted_rows());
        rows
    }

    /// Statistics over the historical prices in the display currency.
    pub fn statistics(&self) -> Option<PriceStatistics> {
        let prices: Vec<f64> = self.historical_rows().iter().map(|r| r.price).collect();
        PriceStatistics::from_prices(&prices)
    }
}
