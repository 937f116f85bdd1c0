use cryptocast::core::{CoreError, Currency};
use cryptocast::{AppCommand, PredictOptions};
use std::fs;
use std::path::Path;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DAY: i64 = 86_400;
    const START: i64 = 1_704_067_200;

    pub fn histoday_body(days: usize) -> String {
        let bars: Vec<String> = (0..days)
            .map(|i| {
                let close = 40_000.0 + 25.0 * i as f64;
                format!(
                    r#"{{"time": {}, "high": {close}, "low": {close}, "open": {close}, "close": {close}}}"#,
                    START + i as i64 * DAY
                )
            })
            .collect();
        format!(
            r#"{{"Response": "Success", "Message": "", "Data": {{"Data": [{}]}}}}"#,
            bars.join(",")
        )
    }

    /// One server answering all three upstream APIs. `history_calls` and
    /// `rate_calls` are the exact number of requests expected.
    pub async fn create_mock_server(history_calls: u64, rate_calls: u64) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/v2/histoday"))
            .and(query_param("fsym", "BTC"))
            .and(query_param("tsym", "USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(histoday_body(150)))
            .expect(history_calls)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .and(query_param("ids", "bitcoin"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"bitcoin": {"usd": 43750.5}}"#),
            )
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/currencies/usd.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"date": "2024-06-01", "usd": {"cny": 7.25}}"#),
            )
            .expect(rate_calls)
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn write_config(dir: &Path, server_uri: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
        currency: "CNY"
        forecast:
          horizon: 14
        providers:
          cryptocompare:
            base_url: {server_uri}
          coingecko:
            base_url: {server_uri}
          currency_api:
            base_url: {server_uri}
        data_path: {}
    "#,
        dir.join("data").display()
    );
    fs::write(&config_path, &config_content).expect("Failed to write config file");
    config_path.to_str().unwrap().to_string()
}

fn predict(symbol: &str, dir: &Path) -> AppCommand {
    AppCommand::Predict(PredictOptions {
        symbol: symbol.to_string(),
        days: Some(120),
        csv: Some(dir.join("prices.csv")),
        pdf: Some(dir.join("prices.pdf")),
        ..Default::default()
    })
}

#[test_log::test(tokio::test)]
async fn test_full_predict_flow_with_exports() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mock_server = test_utils::create_mock_server(1, 1).await;
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = cryptocast::run_command(predict("btc", temp_dir.path()), Some(&config_path)).await;
    assert!(
        result.is_ok(),
        "Predict command failed with: {:?}",
        result.err()
    );

    let csv = fs::read_to_string(temp_dir.path().join("prices.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    info!(rows = lines.len(), "Read CSV export");
    assert_eq!(lines[0], "Segment,Day,Date,Price (USD),Price (CNY)");
    // header + 120 historical + 14 predicted
    assert_eq!(lines.len(), 1 + 120 + 14);
    assert!(lines[1].starts_with("Historical,1,"));
    assert!(lines[121].starts_with("Predicted,1,"));

    let pdf = fs::read(temp_dir.path().join("prices.pdf")).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[test_log::test(tokio::test)]
async fn test_second_run_is_served_from_disk_cache() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    // History and rate are each fetched once across both runs.
    let mock_server = test_utils::create_mock_server(1, 1).await;
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    for _ in 0..2 {
        let result =
            cryptocast::run_command(predict("BTC", temp_dir.path()), Some(&config_path)).await;
        assert!(result.is_ok(), "Predict command failed with: {:?}", result.err());
    }

    let result = cryptocast::run_command(AppCommand::ClearCache, Some(&config_path)).await;
    assert!(result.is_ok());
}

#[test_log::test(tokio::test)]
async fn test_price_command() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mock_server = test_utils::create_mock_server(0, 0).await;
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let result = cryptocast::run_command(
        AppCommand::Price {
            symbol: "BTC".to_string(),
            currency: Some(Currency::Usd),
        },
        Some(&config_path),
    )
    .await;
    assert!(result.is_ok(), "Price command failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_unsupported_symbol_fails() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mock_server = test_utils::create_mock_server(0, 0).await;
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let err = cryptocast::run_command(predict("NOTACOIN", temp_dir.path()), Some(&config_path))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CoreError>(),
        Some(CoreError::UnsupportedSymbol(s)) if s == "NOTACOIN"
    ));
}

#[test_log::test(tokio::test)]
async fn test_invalid_days_is_rejected() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mock_server = test_utils::create_mock_server(0, 0).await;
    let config_path = write_config(temp_dir.path(), &mock_server.uri());

    let command = AppCommand::Predict(PredictOptions {
        symbol: "BTC".to_string(),
        days: Some(10),
        ..Default::default()
    });
    let err = cryptocast::run_command(command, Some(&config_path))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Lookback days must be between 30 and 365"));
}
