use super::{export, ui};
use crate::core::analytics::{PriceReport, PriceRow};
use crate::core::forecast::Forecaster;
use crate::core::{Currency, CurrencyRateProvider, HistoryProvider, SpotPriceProvider};
use crate::providers::symbols;
use anyhow::Result;
use comfy_table::Cell;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Upstream prices are quoted in this currency.
pub const SOURCE_CURRENCY: &str = "USD";

#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub symbol: String,
    pub currency: Currency,
    /// Days of history requested from the upstream API.
    pub limit: u32,
    /// Days of history kept for display and training.
    pub lookback_days: u32,
    pub horizon: u32,
    pub window: usize,
    pub csv: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
}

/// Rate from USD to the display currency. USD itself needs no lookup.
pub async fn display_rate(
    currency: Currency,
    rate_provider: &(dyn CurrencyRateProvider + Send + Sync),
) -> Result<f64> {
    if currency == Currency::Usd {
        return Ok(1.0);
    }
    rate_provider.get_rate(SOURCE_CURRENCY, currency.code()).await
}

/// Fetches, converts and forecasts; the whole pipeline for one symbol.
pub async fn build_report(
    request: &PredictRequest,
    history_provider: &(dyn HistoryProvider + Send + Sync),
    spot_provider: &(dyn SpotPriceProvider + Send + Sync),
    rate_provider: &(dyn CurrencyRateProvider + Send + Sync),
) -> Result<PriceReport> {
    let id = symbols::lookup(&request.symbol)?;
    let symbol = request.symbol.trim().to_uppercase();
    debug!(symbol = %symbol, id = %id, "Resolved symbol");

    let spot_usd = match spot_provider.fetch_usd_price(id).await {
        Ok(price) => price,
        Err(e) => {
            warn!("Current price unavailable for {}: {}", symbol, e);
            None
        }
    };

    let rate = display_rate(request.currency, rate_provider).await?;

    let history = history_provider
        .fetch_history(&symbol, SOURCE_CURRENCY, request.limit)
        .await?
        .tail(request.lookback_days as usize);
    info!(observations = history.len(), "Loaded price history");

    let predicted =
        Forecaster::new(request.window).predict(&history, request.horizon as usize)?;

    Ok(PriceReport {
        symbol,
        currency: request.currency,
        rate,
        spot_usd,
        historical: history,
        predicted,
    })
}

fn price_table(rows: &[PriceRow], price_header: &str) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Day"),
        ui::header_cell("Date"),
        ui::header_cell(price_header),
    ]);

    let mut previous = None;
    for row in rows {
        table.add_row(vec![
            Cell::new(row.day),
            Cell::new(row.date.map(|d| d.to_string()).unwrap_or_default()),
            ui::trend_cell(row.price, previous),
        ]);
        previous = Some(row.price);
    }
    table.to_string()
}

impl PriceReport {
    pub fn display(&self) -> String {
        let currency = self.currency;
        let width = ui::terminal_width().saturating_sub(4);
        let mut output = String::new();

        if let Some(spot_usd) = self.spot_usd {
            output.push_str(&format!(
                "{}\n\n",
                ui::style_text(&format!("Current {} Prices", self.symbol), ui::StyleType::Title)
            ));
            output.push_str(&format!("Price in USD: ${spot_usd:.2}\n"));
            if let Some(spot) = self.spot().filter(|_| currency != Currency::Usd) {
                output.push_str(&format!("Price in {currency}: {spot:.2}\n"));
            }
            output.push('\n');
        }

        let historical = self.historical_rows();
        output.push_str(&format!(
            "{}\n\n",
            ui::style_text(&format!("Historical Prices ({currency})"), ui::StyleType::Title)
        ));
        output.push_str(&price_table(&historical, &format!("Price ({currency})")));
        let prices: Vec<f64> = historical.iter().map(|r| r.price).collect();
        output.push_str(&format!("\n\nTrend: {}\n\n", ui::sparkline(&prices, width)));

        let predicted = self.predicted_rows();
        output.push_str(&format!(
            "{}\n\n",
            ui::style_text(
                &format!(
                    "Predicted {} Prices for the Next {} Days ({currency})",
                    self.symbol,
                    predicted.len()
                ),
                ui::StyleType::Title
            )
        ));
        output.push_str(&price_table(
            &predicted,
            &format!("Predicted Price ({currency})"),
        ));
        let prices: Vec<f64> = predicted.iter().map(|r| r.price).collect();
        output.push_str(&format!("\n\nTrend: {}\n", ui::sparkline(&prices, width)));

        if let Some(stats) = self.statistics() {
            output.push_str(&format!(
                "\n{}\n\n",
                ui::style_text(
                    &format!("Historical Price Statistics ({currency})"),
                    ui::StyleType::Title
                )
            ));
            for (label, value) in [
                ("Mean", stats.mean),
                ("Median", stats.median),
                ("Max", stats.max),
                ("Min", stats.min),
            ] {
                output.push_str(&format!(
                    "{} {}\n",
                    ui::style_text(&format!("{label} Price ({currency}):"), ui::StyleType::TotalLabel),
                    ui::style_text(&format!("{value:.2}"), ui::StyleType::TotalValue)
                ));
            }
        }

        output.push_str(&ui::style_text(
            "\nPredictions are a linear extrapolation of past prices, not advice.",
            ui::StyleType::Subtle,
        ));
        output
    }
}

pub async fn run(
    request: &PredictRequest,
    history_provider: &(dyn HistoryProvider + Send + Sync),
    spot_provider: &(dyn SpotPriceProvider + Send + Sync),
    rate_provider: &(dyn CurrencyRateProvider + Send + Sync),
) -> Result<()> {
    let pb = ui::new_spinner("Fetching prices...");
    let report = build_report(request, history_provider, spot_provider, rate_provider).await;
    pb.finish_and_clear();
    let report = report?;

    println!("{}", report.display());

    if let Some(path) = &request.csv {
        export::export_csv(&report, path)?;
        println!("Data exported to {}", path.display());
    }
    if let Some(path) = &request.pdf {
        export::export_pdf(&report, path)?;
        println!("Data exported to {}", path.display());
    }
    Ok(())
}
