//! CSV and PDF export of a price report.

use crate::core::analytics::{PriceReport, PriceRow};
use crate::core::currency::Currency;
use anyhow::{Context, Result, anyhow};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point, Rgb,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

fn headers(currency: Currency) -> Vec<String> {
    let mut headers = vec![
        "Segment".to_string(),
        "Day".to_string(),
        "Date".to_string(),
        "Price (USD)".to_string(),
    ];
    if currency != Currency::Usd {
        headers.push(format!("Price ({currency})"));
    }
    headers
}

fn record(row: &PriceRow, currency: Currency) -> Vec<String> {
    let mut record = vec![
        row.segment.label().to_string(),
        row.day.to_string(),
        row.date.map(|d| d.to_string()).unwrap_or_default(),
        format!("{:.2}", row.price_usd),
    ];
    if currency != Currency::Usd {
        record.push(format!("{:.2}", row.price));
    }
    record
}

/// Writes historical then predicted rows as CSV.
pub fn write_csv<W: Write>(report: &PriceReport, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(headers(report.currency))?;
    for row in report.all_rows() {
        wtr.write_record(record(&row, report.currency))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv(report: &PriceReport, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    write_csv(report, file)?;
    debug!("Wrote CSV export to {}", path.display());
    Ok(())
}

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN: f32 = 20.0;
const ROW_HEIGHT: f32 = 7.0;
const FONT_SIZE: f32 = 9.0;
const TITLE_SIZE: f32 = 14.0;

struct PdfTable<'a> {
    layer: PdfLayerReference,
    font: &'a IndirectFontRef,
    bold: &'a IndirectFontRef,
    column_width: f32,
}

impl PdfTable<'_> {
    fn horizontal(&self, y: f32, columns: usize) {
        let right = MARGIN + self.column_width * columns as f32;
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(right), Mm(y)), false),
            ],
            is_closed: false,
        });
    }

    fn verticals(&self, top: f32, bottom: f32, columns: usize) {
        for c in 0..=columns {
            let x = MARGIN + self.column_width * c as f32;
            self.layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(x), Mm(top)), false),
                    (Point::new(Mm(x), Mm(bottom)), false),
                ],
                is_closed: false,
            });
        }
    }

    /// Draws one row whose top edge is at `top`.
    fn row(&self, top: f32, cells: &[String], header: bool) {
        let font = if header { self.bold } else { self.font };
        let baseline = top - ROW_HEIGHT + 2.2;
        for (c, text) in cells.iter().enumerate() {
            let x = MARGIN + self.column_width * c as f32 + 2.0;
            self.layer
                .use_text(text.as_str(), FONT_SIZE, Mm(x), Mm(baseline), font);
        }
        self.horizontal(top - ROW_HEIGHT, cells.len());
    }
}

/// Renders the report rows as a grid table over as many US-letter pages as
/// needed, repeating the header row on every page.
pub fn render_pdf(report: &PriceReport) -> Result<Vec<u8>> {
    let title = format!("{} Prices ({})", report.symbol, report.currency);
    let (doc, first_page, first_layer) =
        PdfDocument::new(title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("Failed to load PDF font: {e:?}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("Failed to load PDF font: {e:?}"))?;

    let header = headers(report.currency);
    let columns = header.len();
    let column_width = (PAGE_WIDTH - 2.0 * MARGIN) / columns as f32;
    let rows: Vec<Vec<String>> = report
        .all_rows()
        .iter()
        .map(|r| record(r, report.currency))
        .collect();

    let mut page = Some((first_page, first_layer));
    let mut remaining = rows.as_slice();
    loop {
        let (page_index, layer_index) = match page.take() {
            Some(indices) => indices,
            None => doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1"),
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        layer.set_outline_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
        layer.set_outline_thickness(0.5);

        let mut top = PAGE_HEIGHT - MARGIN;
        if remaining.len() == rows.len() {
            layer.use_text(title.as_str(), TITLE_SIZE, Mm(MARGIN), Mm(top - 6.0), &bold);
            top -= 12.0;
        }

        let table = PdfTable {
            layer,
            font: &font,
            bold: &bold,
            column_width,
        };
        let capacity = (((top - MARGIN) / ROW_HEIGHT) as usize).saturating_sub(1).max(1);
        let (chunk, rest) = remaining.split_at(capacity.min(remaining.len()));

        table.horizontal(top, columns);
        table.row(top, &header, true);
        for (i, cells) in chunk.iter().enumerate() {
            table.row(top - ROW_HEIGHT * (i as f32 + 1.0), cells, false);
        }
        table.verticals(top, top - ROW_HEIGHT * (chunk.len() as f32 + 1.0), columns);

        remaining = rest;
        if remaining.is_empty() {
            break;
        }
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow!("Failed to build PDF: {e:?}"))
}

pub fn export_pdf(report: &PriceReport, path: &Path) -> Result<()> {
    let bytes = render_pdf(report)?;
    let file = File::create(path)
        .with_context(|| format!("Failed to create PDF file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    debug!("Wrote PDF export to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::{HistoricalSeries, PredictedSeries};
    use chrono::{TimeZone, Utc};

    fn report(currency: Currency, days: usize) -> PriceReport {
        let end = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let closes: Vec<f64> = (0..days).map(|i| 100.0 + i as f64).collect();
        PriceReport {
            symbol: "BTC".to_string(),
            currency,
            rate: 7.0,
            spot_usd: None,
            historical: HistoricalSeries::from_daily_closes(end, &closes),
            predicted: PredictedSeries {
                prices: vec![200.0, 201.5],
            },
        }
    }

    #[test]
    fn test_csv_layout() {
        let mut out = Vec::new();
        write_csv(&report(Currency::Cny, 2), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Segment,Day,Date,Price (USD),Price (CNY)");
        assert_eq!(lines[1], "Historical,1,2024-01-30,100.00,700.00");
        assert_eq!(lines[2], "Historical,2,2024-01-31,101.00,707.00");
        assert_eq!(lines[3], "Predicted,1,2024-02-01,200.00,1400.00");
        assert_eq!(lines[4], "Predicted,2,2024-02-02,201.50,1410.50");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_csv_in_usd_has_single_price_column() {
        let mut out = Vec::new();
        write_csv(&report(Currency::Usd, 1), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Segment,Day,Date,Price (USD)\n"));
    }

    #[test]
    fn test_pdf_spans_pages() {
        let bytes = render_pdf(&report(Currency::Cny, 365)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = report(Currency::Usd, 3);

        let csv_path = dir.path().join("prices.csv");
        export_csv(&report, &csv_path).unwrap();
        assert_eq!(std::fs::read_to_string(&csv_path).unwrap().lines().count(), 6);

        let pdf_path = dir.path().join("prices.pdf");
        export_pdf(&report, &pdf_path).unwrap();
        assert!(std::fs::metadata(&pdf_path).unwrap().len() > 0);
    }
}
