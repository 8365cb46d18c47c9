//! Fixed catalog of the functions the model may call

use serde_json::{Map, Value, json};
use std::fmt::Display;
use std::str::FromStr;

use crate::core::error::{AssistantError, Result};
use crate::core::message::FunctionCall;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockFunction {
    GetStockPrice,
    CalculateSma,
    CalculateEma,
    CalculateRsi,
    CalculateMacd,
    PlotStockPrice,
}

impl StockFunction {
    /// Every function in the order offered to the model.
    pub const ALL: [StockFunction; 6] = [
        StockFunction::GetStockPrice,
        StockFunction::CalculateSma,
        StockFunction::CalculateEma,
        StockFunction::CalculateRsi,
        StockFunction::CalculateMacd,
        StockFunction::PlotStockPrice,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StockFunction::GetStockPrice => "get_stock_price",
            StockFunction::CalculateSma => "calculate_sma",
            StockFunction::CalculateEma => "calculate_ema",
            StockFunction::CalculateRsi => "calculate_rsi",
            StockFunction::CalculateMacd => "calculate_macd",
            StockFunction::PlotStockPrice => "plot_stock_price",
        }
    }

    pub fn spec(&self) -> FunctionSpec {
        let ticker = |example: &str| ParamSpec {
            name: "ticker",
            kind: ParamType::String,
            description: format!(
                "The stock ticker symbol for a company (for example {example})."
            ),
            required: true,
        };

        match self {
            StockFunction::GetStockPrice => FunctionSpec {
                name: self.name(),
                description: "Gets the latest stock price given the ticker symbol of a company.",
                parameters: vec![ticker("AAPL for Apple")],
            },
            StockFunction::CalculateSma => FunctionSpec {
                name: self.name(),
                description: "Calculate the simple moving average for a given stock ticker and a window.",
                parameters: vec![
                    ticker("AAPL for Apple"),
                    ParamSpec {
                        name: "window",
                        kind: ParamType::Integer,
                        description: "The timeframe to consider when calculating the SMA"
                            .to_string(),
                        required: true,
                    },
                ],
            },
            StockFunction::CalculateEma => FunctionSpec {
                name: self.name(),
                description: "Calculates the latest Exponential Moving Average (EMA) for a given stock using a specified window over the past year.",
                parameters: vec![
                    ticker("MSFT for Microsoft"),
                    ParamSpec {
                        name: "window",
                        kind: ParamType::Integer,
                        description: "The number of days over which the EMA is calculated."
                            .to_string(),
                        required: true,
                    },
                ],
            },
            StockFunction::CalculateRsi => FunctionSpec {
                name: self.name(),
                description: "Calculates the current Relative Strength Index (RSI) value for a given stock based on 14-day smoothing over the past year.",
                parameters: vec![ticker("TSLA for Tesla")],
            },
            StockFunction::CalculateMacd => FunctionSpec {
                name: self.name(),
                description: "Calculates the Moving Average Convergence Divergence (MACD), signal line, and MACD histogram for a given stock based on 12, 26, and 9-day EMAs over the past year.",
                parameters: vec![ticker("GOOG for Google")],
            },
            StockFunction::PlotStockPrice => FunctionSpec {
                name: self.name(),
                description: "Generates and saves a line plot showing the daily closing stock price of a company over the past year.",
                parameters: vec![ticker("NFLX for Netflix")],
            },
        }
    }
}

impl Display for StockFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StockFunction {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StockFunction::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| AssistantError::UnknownFunction(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
}

impl ParamType {
    fn as_schema_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
}

/// Declarative description of a callable function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParamSpec>,
}

impl FunctionSpec {
    /// JSON schema object in the shape expected by function-calling APIs.
    pub fn to_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.to_string(),
                    json!({ "type": p.kind.as_schema_type(), "description": p.description }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "name": self.name,
            "description": self.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            }
        })
    }
}

pub fn list_specs() -> Vec<FunctionSpec> {
    StockFunction::ALL.iter().map(|f| f.spec()).collect()
}

pub fn resolve(name: &str) -> Result<StockFunction> {
    name.parse()
}

/// A fully validated call, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    GetStockPrice { ticker: String },
    CalculateSma { ticker: String, window: usize },
    CalculateEma { ticker: String, window: usize },
    CalculateRsi { ticker: String },
    CalculateMacd { ticker: String },
    PlotStockPrice { ticker: String },
}

impl Invocation {
    pub fn function(&self) -> StockFunction {
        match self {
            Invocation::GetStockPrice { .. } => StockFunction::GetStockPrice,
            Invocation::CalculateSma { .. } => StockFunction::CalculateSma,
            Invocation::CalculateEma { .. } => StockFunction::CalculateEma,
            Invocation::CalculateRsi { .. } => StockFunction::CalculateRsi,
            Invocation::CalculateMacd { .. } => StockFunction::CalculateMacd,
            Invocation::PlotStockPrice { .. } => StockFunction::PlotStockPrice,
        }
    }
}

/// Resolves the function, parses its payload and checks it against the
/// function's parameter schema.
pub fn parse_call(call: &FunctionCall) -> Result<Invocation> {
    let function = resolve(&call.name)?;
    let payload: Value = serde_json::from_str(&call.arguments).map_err(|source| {
        AssistantError::MalformedArguments {
            function: call.name.clone(),
            source,
        }
    })?;
    let args = match payload {
        Value::Object(map) => map,
        other => {
            return Err(AssistantError::invalid_arguments(
                function.name(),
                format!("expected an object, got {other}"),
            ));
        }
    };
    extract_arguments(function, &args)
}

pub fn extract_arguments(function: StockFunction, args: &Map<String, Value>) -> Result<Invocation> {
    let spec = function.spec();
    let fname = function.name();

    if let Some(extra) = args
        .keys()
        .find(|k| !spec.parameters.iter().any(|p| p.name == k.as_str()))
    {
        return Err(AssistantError::invalid_arguments(
            fname,
            format!("unexpected parameter '{extra}'"),
        ));
    }
    if let Some(missing) = spec
        .parameters
        .iter()
        .find(|p| p.required && !args.contains_key(p.name))
    {
        return Err(AssistantError::invalid_arguments(
            fname,
            format!("missing required parameter '{}'", missing.name),
        ));
    }

    let ticker = ticker_arg(fname, args)?;
    let invocation = match function {
        StockFunction::GetStockPrice => Invocation::GetStockPrice { ticker },
        StockFunction::CalculateSma => Invocation::CalculateSma {
            ticker,
            window: window_arg(fname, args)?,
        },
        StockFunction::CalculateEma => Invocation::CalculateEma {
            ticker,
            window: window_arg(fname, args)?,
        },
        StockFunction::CalculateRsi => Invocation::CalculateRsi { ticker },
        StockFunction::CalculateMacd => Invocation::CalculateMacd { ticker },
        StockFunction::PlotStockPrice => Invocation::PlotStockPrice { ticker },
    };
    Ok(invocation)
}

/// Exchange symbols such as `BRK-B`, `^GSPC`, `EURUSD=X` or `RY.TO`.
fn is_symbol_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || matches!(c, '.' | '^' | '=' | '-')
}

fn ticker_arg(function: &str, args: &Map<String, Value>) -> Result<String> {
    let ticker = match args.get("ticker") {
        Some(Value::String(s)) => s.trim().to_uppercase(),
        _ => {
            return Err(AssistantError::invalid_arguments(
                function,
                "'ticker' must be a string",
            ));
        }
    };
    if ticker.is_empty() {
        return Err(AssistantError::invalid_arguments(
            function,
            "'ticker' must not be empty",
        ));
    }
    if !ticker.chars().all(is_symbol_char) {
        return Err(AssistantError::invalid_arguments(
            function,
            format!("'ticker' contains characters not allowed in a symbol: {ticker}"),
        ));
    }
    Ok(ticker)
}

fn window_arg(function: &str, args: &Map<String, Value>) -> Result<usize> {
    args.get("window")
        .and_then(Value::as_u64)
        .filter(|w| *w > 0)
        .and_then(|w| usize::try_from(w).ok())
        .ok_or_else(|| {
            AssistantError::invalid_arguments(function, "'window' must be a positive integer")
        })
}
