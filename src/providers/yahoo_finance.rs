use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::core::error::{AssistantError, Result};
use crate::core::market::{MarketDataProvider, PriceBar, PriceSeries};

const SERVICE: &str = "Yahoo Finance";

// YahooFinanceProvider implementation for MarketDataProvider
pub struct YahooFinanceProvider {
    base_url: Url,
    client: reqwest::Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("stockchat/0.1")
            .build()
            .map_err(|e| AssistantError::service_unavailable(SERVICE, e.to_string()))?;
        let base_url = Url::parse(base_url).map_err(|e| {
            AssistantError::service_unavailable(SERVICE, format!("Invalid base URL: {e}"))
        })?;

        Ok(YahooFinanceProvider { base_url, client })
    }

    /// Daily bars for the last year. The ticker is a single escaped path
    /// segment so it can never alter the query.
    fn chart_url(&self, ticker: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AssistantError::service_unavailable(SERVICE, "base URL cannot hold a path")
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", "1y");
        Ok(url)
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct ChartMeta {
    currency: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
}

fn value_at(values: &Option<Vec<Option<f64>>>, index: usize) -> Option<f64> {
    values.as_ref().and_then(|v| v.get(index).copied().flatten())
}

/// Builds daily bars, skipping days without a close.
fn extract_bars(item: &ChartItem) -> Vec<PriceBar> {
    let (Some(timestamps), Some(quote)) = (
        item.timestamp.as_ref(),
        item.indicators.as_ref().and_then(|i| i.quote.first()),
    ) else {
        return Vec::new();
    };

    timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let close = value_at(&quote.close, i)?;
            let date = Utc.timestamp_opt(*ts, 0).single()?.date_naive();
            Some(PriceBar {
                date,
                open: value_at(&quote.open, i),
                high: value_at(&quote.high, i),
                low: value_at(&quote.low, i),
                close,
            })
        })
        .collect()
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooHistoryFetch",
        skip(self),
        fields(ticker = %ticker)
    )]
    async fn fetch_history(&self, ticker: &str) -> Result<PriceSeries> {
        let url = self.chart_url(ticker)?;
        debug!("Requesting price history from {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            AssistantError::service_unavailable(
                SERVICE,
                format!("Request error: {e} for symbol: {ticker}"),
            )
        })?;

        let status = response.status();
        debug!(%status, "Received Yahoo response");
        if status == StatusCode::NOT_FOUND {
            return Err(AssistantError::data_unavailable(ticker, "symbol not found"));
        }
        if !status.is_success() {
            return Err(AssistantError::service_unavailable(
                SERVICE,
                format!("HTTP error: {status} for symbol: {ticker}"),
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AssistantError::service_unavailable(SERVICE, e.to_string()))?;
        let data: YahooChartResponse = serde_json::from_str(&text).map_err(|e| {
            AssistantError::service_unavailable(
                SERVICE,
                format!("Failed to parse JSON response for {ticker}: {e}"),
            )
        })?;

        if let Some(err) = data.chart.error {
            let reason = err
                .description
                .or(err.code)
                .unwrap_or_else(|| "provider reported an error".to_string());
            return Err(AssistantError::data_unavailable(ticker, reason));
        }

        let item = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or_else(|| AssistantError::data_unavailable(ticker, "no price data found"))?;

        let currency = item.meta.as_ref().and_then(|m| m.currency.clone());
        let bars = extract_bars(&item);
        debug!(bars = bars.len(), "Parsed price history");

        PriceSeries::new(ticker, currency, bars)
    }
}
