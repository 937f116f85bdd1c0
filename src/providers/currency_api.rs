use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::USER_AGENT;
use crate::core::currency::CurrencyRateProvider;
use crate::core::error::CoreError;

/// `{"date": "2024-05-01", "usd": {"cny": 7.24, "eur": 0.93, ...}}`
#[derive(Debug, Deserialize)]
struct RateTableResponse {
    #[serde(default)]
    date: Option<String>,
    #[serde(flatten)]
    tables: HashMap<String, HashMap<String, f64>>,
}

/// Exchange rates from the fawazahmed0 currency-api daily tables.
pub struct CurrencyApiProvider {
    base_url: String,
}

impl CurrencyApiProvider {
    pub fn new(base_url: &str) -> Self {
        CurrencyApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64> {
        let url = format!("{}/v1/currencies/{}.json", self.base_url, from);
        debug!("Requesting currency rate from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        let text = response.text().await?;
        let data: RateTableResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;
        debug!(date = ?data.date, "Received rate table");

        data.tables
            .get(from)
            .and_then(|table| table.get(to))
            .copied()
            .ok_or_else(|| anyhow!("No rate found in response"))
    }
}

#[async_trait]
impl CurrencyRateProvider for CurrencyApiProvider {
    #[instrument(name = "CurrencyApiRateFetch", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let (from, to) = (from.to_lowercase(), to.to_lowercase());
        self.fetch_rate(&from, &to)
            .await
            .map_err(|e| CoreError::rate_fetch(&from.to_uppercase(), &to.to_uppercase(), e).into())
    }
}
