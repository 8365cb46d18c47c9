//! Provides pure technical indicator calculations over closing prices.
//!
//! All exponential averages are unadjusted and seeded from the first value of
//! the input series.
use std::fmt::Display;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST_SPAN: usize = 12;
pub const MACD_SLOW_SPAN: usize = 26;
pub const MACD_SIGNAL_SPAN: usize = 9;

/// Arithmetic mean of the trailing `window` values.
///
/// Returns `None` when the series holds fewer than `window` values or the
/// window is zero.
pub fn sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Exponentially weighted series with the given smoothing factor.
fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &value in values {
        let next = match prev {
            None => value,
            Some(p) => alpha * value + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// EMA series using α = 2 / (span + 1).
pub fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    ewm(values, 2.0 / (span as f64 + 1.0))
}

/// Latest EMA value, `None` for an empty series or zero span.
pub fn ema(values: &[f64], span: usize) -> Option<f64> {
    if span == 0 {
        return None;
    }
    ema_series(values, span).last().copied()
}

/// Relative Strength Index reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RsiValue {
    Value(f64),
    /// Average loss is zero, so the relative strength ratio has no finite value.
    Undefined,
}

impl Display for RsiValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RsiValue::Value(v) => write!(f, "{v}"),
            RsiValue::Undefined => write!(f, "undefined (average loss is zero)"),
        }
    }
}

/// RSI with Wilder smoothing (α = 1 / period) of gains and losses.
///
/// Needs at least two closes to form a price change.
pub fn rsi(values: &[f64], period: usize) -> Option<RsiValue> {
    if period == 0 || values.len() < 2 {
        return None;
    }
    let (gains, losses): (Vec<f64>, Vec<f64>) = values
        .windows(2)
        .map(|w| {
            let delta = w[1] - w[0];
            (delta.max(0.0), (-delta).max(0.0))
        })
        .unzip();

    let alpha = 1.0 / period as f64;
    let avg_gain = *ewm(&gains, alpha).last()?;
    let avg_loss = *ewm(&losses, alpha).last()?;

    if avg_loss == 0.0 {
        return Some(RsiValue::Undefined);
    }
    let rs = avg_gain / avg_loss;
    Some(RsiValue::Value(100.0 - 100.0 / (1.0 + rs)))
}

/// Latest MACD line, signal line and histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl Display for Macd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.macd, self.signal, self.histogram)
    }
}

pub fn macd(values: &[f64]) -> Option<Macd> {
    let fast = ema_series(values, MACD_FAST_SPAN);
    let slow = ema_series(values, MACD_SLOW_SPAN);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema_series(&line, MACD_SIGNAL_SPAN);

    let macd = *line.last()?;
    let signal = *signal.last()?;
    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}
