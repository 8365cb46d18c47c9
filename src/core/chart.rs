//! Price chart rendering

use chrono::Duration;
use plotters::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::error::{AssistantError, Result};
use crate::core::market::PriceSeries;

const CHART_SIZE: (u32, u32) = (1000, 500);

/// Image written for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub ticker: String,
    pub path: PathBuf,
}

fn render_error(e: impl std::fmt::Display) -> AssistantError {
    AssistantError::ChartRender(e.to_string())
}

/// Draws the daily closes of `series` as a line chart and writes it to
/// `path`, replacing any previous chart.
pub fn render_price_chart(series: &PriceSeries, path: &Path) -> Result<ChartArtifact> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(render_error)?;
    }

    let bars = series.bars();
    let mut first_date = bars[0].date;
    let mut last_date = series.latest().date;
    if first_date == last_date {
        first_date -= Duration::days(1);
        last_date += Duration::days(1);
    }

    let (mut low, mut high) = bars.iter().fold((f64::MAX, f64::MIN), |(lo, hi), b| {
        (lo.min(b.close), hi.max(b.close))
    });
    let pad = ((high - low) * 0.05).max(0.01);
    low -= pad;
    high += pad;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("{} Stock Price over last year", series.ticker()),
            ("sans-serif", 24),
        )
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(first_date..last_date, low..high)
        .map_err(render_error)?;

    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Stock Price ($)")
        .x_labels(8)
        .y_label_formatter(&|y| format!("{y:.2}"))
        .draw()
        .map_err(render_error)?;

    chart
        .draw_series(LineSeries::new(
            bars.iter().map(|b| (b.date, b.close)),
            &BLUE,
        ))
        .map_err(render_error)?;

    root.present().map_err(render_error)?;
    debug!(path = %path.display(), points = bars.len(), "Rendered price chart");

    Ok(ChartArtifact {
        ticker: series.ticker().to_string(),
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::market::PriceBar;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar {
                date: start + Duration::days(i as i64),
                open: None,
                high: None,
                low: None,
                close,
            })
            .collect();
        PriceSeries::new("TSLA", Some("USD".to_string()), bars).unwrap()
    }

    #[test]
    fn test_chart_is_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("charts").join("stock.svg");

        let artifact = render_price_chart(&series(&[180.0, 182.5, 179.2, 185.0]), &path).unwrap();
        assert_eq!(artifact.ticker, "TSLA");
        assert_eq!(artifact.path, path);

        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("TSLA Stock Price over last year"));
    }

    #[test]
    fn test_chart_overwrites_previous_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stock.svg");
        std::fs::write(&path, "stale").unwrap();

        render_price_chart(&series(&[10.0]), &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(!svg.contains("stale"));
    }
}
