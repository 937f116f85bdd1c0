use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::USER_AGENT;
use crate::core::cache::ResponseCache;
use crate::core::error::CoreError;
use crate::core::price::{HistoricalSeries, HistoryProvider, PriceObservation};

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct HistoDayResponse {
    response: String,
    #[serde(default)]
    message: String,
    data: Option<HistoDayData>,
}

#[derive(Deserialize, Debug)]
struct HistoDayData {
    #[serde(rename = "Data", default)]
    bars: Vec<HistoDayBar>,
}

#[derive(Deserialize, Debug)]
struct HistoDayBar {
    time: i64,
    close: f64,
}

/// Parses a `histoday` body into a series holding at most `limit` of the
/// most recent observations.
pub fn parse_history(body: &str, limit: u32) -> Result<HistoricalSeries> {
    let response: HistoDayResponse =
        serde_json::from_str(body).map_err(|e| anyhow!("Failed to parse JSON response: {}", e))?;

    if !response.response.eq_ignore_ascii_case("success") {
        return Err(anyhow!("Upstream error: {}", response.message));
    }

    let bars = response
        .data
        .map(|d| d.bars)
        .ok_or_else(|| anyhow!("Response has no price data"))?;

    let observations = bars
        .into_iter()
        .map(|bar| {
            Utc.timestamp_opt(bar.time, 0)
                .single()
                .map(|timestamp| PriceObservation {
                    timestamp,
                    close: bar.close,
                })
                .ok_or_else(|| anyhow!("Invalid timestamp: {}", bar.time))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(HistoricalSeries::from_observations(observations).tail(limit as usize))
}

/// Daily history from the CryptoCompare `histoday` endpoint. Raw response
/// bodies are kept in a [`ResponseCache`] and served from there when present.
pub struct CryptoCompareProvider {
    base_url: String,
    cache: ResponseCache,
}

impl CryptoCompareProvider {
    pub fn new(base_url: &str, cache: ResponseCache) -> Self {
        CryptoCompareProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    async fn request(&self, symbol: &str, currency: &str, limit: u32) -> Result<String> {
        let url = format!(
            "{}/data/v2/histoday?fsym={}&tsym={}&limit={}",
            self.base_url, symbol, currency, limit
        );
        debug!("Requesting price history from {}", url);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {}", response.status()));
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl HistoryProvider for CryptoCompareProvider {
    #[instrument(name = "CryptoCompareHistoryFetch", skip(self))]
    async fn fetch_history(
        &self,
        symbol: &str,
        currency: &str,
        limit: u32,
    ) -> Result<HistoricalSeries> {
        if let Some(cached) = self.cache.load(symbol, currency, limit).await {
            match parse_history(&cached, limit) {
                Ok(series) => return Ok(series),
                Err(e) => {
                    debug!("Discarding unreadable cached response: {}", e);
                    self.cache.discard(symbol, currency, limit).await;
                }
            }
        }

        let body = self
            .request(symbol, currency, limit)
            .await
            .map_err(|e| CoreError::fetch(symbol, currency, e))?;
        let series =
            parse_history(&body, limit).map_err(|e| CoreError::fetch(symbol, currency, e))?;
        debug!(observations = series.len(), "Fetched price history");

        self.cache.save(symbol, currency, limit, &body).await;
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{CacheMode, KeyValueCollection};
    use crate::store::memory::MemoryCollection;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DAY: i64 = 86_400;
    const START: i64 = 1_700_006_400;

    fn histoday_body(closes: &[f64]) -> String {
        let bars: Vec<String> = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                format!(
                    r#"{{"time": {}, "high": {c}, "low": {c}, "open": {c}, "volumefrom": 1.0, "volumeto": 1.0, "close": {c}}}"#,
                    START + i as i64 * DAY
                )
            })
            .collect();
        format!(
            r#"{{"Response": "Success", "Message": "", "HasWarning": false, "Type": 100,
                "Data": {{"Aggregated": false, "TimeFrom": {START}, "TimeTo": {}, "Data": [{}]}}}}"#,
            START + closes.len() as i64 * DAY,
            bars.join(",")
        )
    }

    fn provider(server: &MockServer, mode: CacheMode) -> CryptoCompareProvider {
        let cache = ResponseCache::new(Arc::new(MemoryCollection::new()), mode);
        CryptoCompareProvider::new(&server.uri(), cache)
    }

    async fn mount_history(server: &MockServer, symbol: &str, body: String, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/data/v2/histoday"))
            .and(query_param("fsym", symbol))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(calls)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_successful_history_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/v2/histoday"))
            .and(query_param("fsym", "BTC"))
            .and(query_param("tsym", "USD"))
            .and(query_param("limit", "3"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(histoday_body(&[1.0, 2.0, 3.0, 4.0])),
            )
            .mount(&server)
            .await;

        let provider = provider(&server, CacheMode::Keyed);
        let series = provider.fetch_history("BTC", "USD", 3).await.unwrap();

        // Upstream sends limit + 1 bars; only the latest `limit` are kept.
        assert_eq!(series.closes(), vec![2.0, 3.0, 4.0]);
        assert!(
            series
                .observations()
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp)
        );
        assert_eq!(
            series.last().unwrap().timestamp.timestamp(),
            START + 3 * DAY
        );
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let server = MockServer::start().await;
        mount_history(&server, "BTC", histoday_body(&[5.0, 6.0, 7.0]), 1).await;

        let provider = provider(&server, CacheMode::Keyed);
        let first = provider.fetch_history("BTC", "USD", 365).await.unwrap();
        let second = provider.fetch_history("BTC", "USD", 365).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_keyed_cache_fetches_each_symbol() {
        let server = MockServer::start().await;
        mount_history(&server, "BTC", histoday_body(&[5.0, 6.0]), 1).await;
        mount_history(&server, "ETH", histoday_body(&[1.0, 1.5]), 1).await;

        let provider = provider(&server, CacheMode::Keyed);
        let btc = provider.fetch_history("BTC", "USD", 365).await.unwrap();
        let eth = provider.fetch_history("ETH", "USD", 365).await.unwrap();
        assert_eq!(btc.closes(), vec![5.0, 6.0]);
        assert_eq!(eth.closes(), vec![1.0, 1.5]);
    }

    #[tokio::test]
    async fn test_single_slot_cache_returns_first_response_for_any_query() {
        let server = MockServer::start().await;
        mount_history(&server, "BTC", histoday_body(&[5.0, 6.0]), 1).await;
        mount_history(&server, "ETH", histoday_body(&[1.0, 1.5]), 0).await;

        let provider = provider(&server, CacheMode::SingleSlot);
        let btc = provider.fetch_history("BTC", "USD", 365).await.unwrap();
        let eth = provider.fetch_history("ETH", "USD", 365).await.unwrap();
        assert_eq!(btc, eth);
    }

    #[tokio::test]
    async fn test_upstream_error_envelope() {
        let server = MockServer::start().await;
        let body = r#"{"Response": "Error", "Message": "fsym is a required param.", "Data": {}}"#;
        mount_history(&server, "NOPE", body.to_string(), 1).await;

        let provider = provider(&server, CacheMode::Keyed);
        let err = provider.fetch_history("NOPE", "USD", 30).await.unwrap_err();
        let core = err.downcast_ref::<CoreError>().expect("CoreError");
        assert!(matches!(core, CoreError::Fetch { .. }));
        assert!(err.to_string().contains("fsym is a required param."));
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/v2/histoday"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider(&server, CacheMode::Keyed);
        let err = provider.fetch_history("BTC", "USD", 30).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to fetch price history for BTC/USD: HTTP error: 500 Internal Server Error"
        );
        assert!(provider.fetch_history("BTC", "USD", 30).await.is_err());
    }

    #[tokio::test]
    async fn test_unreadable_cache_entry_is_discarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/v2/histoday"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let collection = Arc::new(MemoryCollection::new());
        collection
            .put("history:BTC:USD:30", "<html>".to_string())
            .await;
        let provider = CryptoCompareProvider::new(
            &server.uri(),
            ResponseCache::new(collection.clone(), CacheMode::Keyed),
        );

        assert!(provider.fetch_history("BTC", "USD", 30).await.is_err());
        assert!(collection.get("history:BTC:USD:30").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let server = MockServer::start().await;
        mount_history(&server, "BTC", r#"{"Data": []}"#.to_string(), 1).await;

        let provider = provider(&server, CacheMode::Keyed);
        let err = provider.fetch_history("BTC", "USD", 30).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse JSON response"));
    }

    #[test]
    fn test_parse_sorts_and_deduplicates() {
        let body = format!(
            r#"{{"Response": "Success", "Data": {{"Data": [
                {{"time": {}, "close": 3.0}},
                {{"time": {}, "close": 1.0}},
                {{"time": {}, "close": 9.0}},
                {{"time": {}, "close": 2.0}}
            ]}}}}"#,
            START + 2 * DAY,
            START,
            START,
            START + DAY
        );
        let series = parse_history(&body, 365).unwrap();
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }
}
