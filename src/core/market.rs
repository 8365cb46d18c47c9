//! Market data abstractions and core types

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::error::{AssistantError, Result};

/// One daily bar. Open, high and low may be missing from provider data; the
/// close is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
}

/// Daily history for a ticker, oldest bar first. Never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    currency: Option<String>,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(ticker: &str, currency: Option<String>, mut bars: Vec<PriceBar>) -> Result<Self> {
        if bars.is_empty() {
            return Err(AssistantError::data_unavailable(
                ticker,
                "provider returned no closing prices",
            ));
        }
        bars.sort_by_key(|b| b.date);

        Ok(PriceSeries {
            ticker: ticker.to_string(),
            currency,
            bars,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn latest(&self) -> &PriceBar {
        // Non-empty by construction
        &self.bars[self.bars.len() - 1]
    }
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Fetches one year of daily bars ending at the latest trading day.
    ///
    /// A ticker without data fails with `DataUnavailable`; transport and
    /// provider-side failures fail with `ServiceUnavailable`.
    async fn fetch_history(&self, ticker: &str) -> Result<PriceSeries>;
}
