use super::predict::display_rate;
use super::ui;
use crate::core::currency::convert;
use crate::core::{Currency, CurrencyRateProvider, SpotPriceProvider};
use crate::providers::symbols;
use anyhow::{Result, anyhow};
use comfy_table::Cell;

/// Current price of one symbol in USD and the display currency.
pub async fn run(
    symbol: &str,
    currency: Currency,
    spot_provider: &(dyn SpotPriceProvider + Send + Sync),
    rate_provider: &(dyn CurrencyRateProvider + Send + Sync),
) -> Result<()> {
    let id = symbols::lookup(symbol)?;
    let symbol = symbol.trim().to_uppercase();

    let pb = ui::new_spinner("Fetching price...");
    let prices = async {
        let usd = spot_provider
            .fetch_usd_price(id)
            .await?
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;
        let rate = display_rate(currency, rate_provider).await?;
        Ok::<_, anyhow::Error>((usd, rate))
    }
    .await;
    pb.finish_and_clear();
    let (usd, rate) = prices?;

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Price")]);
    table.add_row(vec![Cell::new("USD"), ui::price_cell(usd)]);
    if currency != Currency::Usd {
        table.add_row(vec![Cell::new(currency), ui::price_cell(convert(usd, rate))]);
    }

    println!(
        "{}\n\n{}",
        ui::style_text(&format!("Current {symbol} Price ({id})"), ui::StyleType::Title),
        table
    );
    Ok(())
}
