//! Runs registry invocations against live market data

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::core::chart::{ChartArtifact, render_price_chart};
use crate::core::error::{AssistantError, Result};
use crate::core::indicators::{self, RSI_PERIOD};
use crate::core::market::{MarketDataProvider, PriceSeries};
use crate::core::registry::Invocation;

/// Output of a function call. Charts go to the presentation layer; text goes
/// back into the conversation.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionOutput {
    Text(String),
    Chart(ChartArtifact),
}

pub struct StockToolkit {
    provider: Arc<dyn MarketDataProvider>,
    chart_path: PathBuf,
}

impl StockToolkit {
    pub fn new(provider: Arc<dyn MarketDataProvider>, chart_path: impl Into<PathBuf>) -> Self {
        StockToolkit {
            provider,
            chart_path: chart_path.into(),
        }
    }

    #[instrument(name = "InvokeFunction", skip(self), fields(function = %invocation.function()))]
    pub async fn invoke(&self, invocation: &Invocation) -> Result<FunctionOutput> {
        let output = match invocation {
            Invocation::GetStockPrice { ticker } => {
                FunctionOutput::Text(self.get_stock_price(ticker).await?)
            }
            Invocation::CalculateSma { ticker, window } => {
                FunctionOutput::Text(self.calculate_sma(ticker, *window).await?)
            }
            Invocation::CalculateEma { ticker, window } => {
                FunctionOutput::Text(self.calculate_ema(ticker, *window).await?)
            }
            Invocation::CalculateRsi { ticker } => {
                FunctionOutput::Text(self.calculate_rsi(ticker).await?)
            }
            Invocation::CalculateMacd { ticker } => {
                FunctionOutput::Text(self.calculate_macd(ticker).await?)
            }
            Invocation::PlotStockPrice { ticker } => {
                FunctionOutput::Chart(self.plot_stock_price(ticker).await?)
            }
        };
        debug!(?output, "Function completed");
        Ok(output)
    }

    async fn history(&self, ticker: &str) -> Result<PriceSeries> {
        self.provider.fetch_history(ticker).await
    }

    pub async fn get_stock_price(&self, ticker: &str) -> Result<String> {
        let series = self.history(ticker).await?;
        Ok(series.latest().close.to_string())
    }

    /// `NaN` when the year of data is shorter than the window.
    pub async fn calculate_sma(&self, ticker: &str, window: usize) -> Result<String> {
        let closes = self.history(ticker).await?.closes();
        Ok(indicators::sma(&closes, window)
            .unwrap_or(f64::NAN)
            .to_string())
    }

    pub async fn calculate_ema(&self, ticker: &str, window: usize) -> Result<String> {
        let closes = self.history(ticker).await?.closes();
        indicators::ema(&closes, window)
            .map(|v| v.to_string())
            .ok_or_else(|| AssistantError::data_unavailable(ticker, "not enough prices for EMA"))
    }

    pub async fn calculate_rsi(&self, ticker: &str) -> Result<String> {
        let closes = self.history(ticker).await?.closes();
        indicators::rsi(&closes, RSI_PERIOD)
            .map(|v| v.to_string())
            .ok_or_else(|| {
                AssistantError::data_unavailable(
                    ticker,
                    "at least two closing prices are needed for RSI",
                )
            })
    }

    pub async fn calculate_macd(&self, ticker: &str) -> Result<String> {
        let closes = self.history(ticker).await?.closes();
        indicators::macd(&closes)
            .map(|m| m.to_string())
            .ok_or_else(|| AssistantError::data_unavailable(ticker, "not enough prices for MACD"))
    }

    pub async fn plot_stock_price(&self, ticker: &str) -> Result<ChartArtifact> {
        let series = self.history(ticker).await?;
        render_price_chart(&series, &self.chart_path)
    }
}
