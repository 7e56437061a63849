use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::fields::FieldSet;

pub type JsonObject = serde_json::Map<String, serde_json::Value>;

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Upstream data source. Each kind has exactly one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Brokerage daily-bar source
    Alpaca,
    /// Consumer market-data source
    Yahoo,
    /// Fundamentals provider A
    AlphaVantage,
    /// Fundamentals provider B
    Fmp,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::AlphaVantage,
        ProviderKind::Yahoo,
        ProviderKind::Fmp,
        ProviderKind::Alpaca,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Alpaca => "alpaca",
            ProviderKind::Yahoo => "yahoo",
            ProviderKind::AlphaVantage => "alpha_vantage",
            ProviderKind::Fmp => "fmp",
        }
    }

    /// Prefix used for per-provider environment variables.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            ProviderKind::Alpaca => "ALPACA",
            ProviderKind::Yahoo => "YAHOO",
            ProviderKind::AlphaVantage => "ALPHA_VANTAGE",
            ProviderKind::Fmp => "FMP",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "alpaca" => Ok(ProviderKind::Alpaca),
            "yahoo" | "yfinance" => Ok(ProviderKind::Yahoo),
            "alpha_vantage" | "alphavantage" => Ok(ProviderKind::AlphaVantage),
            "fmp" => Ok(ProviderKind::Fmp),
            _ => Err(ConfigError::Invalid {
                key: "provider".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Unparsed provider response, still in the provider's own field vocabulary.
#[derive(Debug, Clone)]
pub enum RawPayload {
    /// Daily bars, oldest first
    Bars(Vec<Bar>),
    /// A single Yahoo quote object
    Quote(JsonObject),
    /// Alpha Vantage OVERVIEW plus the GLOBAL_QUOTE body when it was available
    Overview {
        overview: JsonObject,
        quote: Option<JsonObject>,
    },
    /// FMP income-statement-growth rows and the ratios-ttm row
    Fundamentals {
        growth: Vec<JsonObject>,
        ratios: JsonObject,
    },
}

/// Trims and uppercases a ticker. Returns `None` for blank input.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        None
    } else {
        Some(symbol)
    }
}

/// Analyst rating counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystRatings {
    pub strong_buy: u32,
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
    pub strong_sell: u32,
}

impl AnalystRatings {
    pub fn total(&self) -> u64 {
        self.strong_buy as u64
            + self.buy as u64
            + self.hold as u64
            + self.sell as u64
            + self.strong_sell as u64
    }

    /// Sum of counts weighted 5 (strong buy) down to 1 (strong sell).
    pub fn weighted_total(&self) -> u64 {
        5 * self.strong_buy as u64
            + 4 * self.buy as u64
            + 3 * self.hold as u64
            + 2 * self.sell as u64
            + self.strong_sell as u64
    }
}

/// Canonical, provider-agnostic metrics snapshot for one security.
///
/// Percent-like fields (growth, yield, margins, ROE) are fractions: 0.08 means 8%.
/// Numeric fields are never null; absent upstream values hold the neutral default.
/// The three `Option` fields feed the fundamentals-only scoring strategy, which
/// treats absence differently from zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub symbol: String,
    pub price: f64,
    pub sector: String,
    pub pe_ratio: f64,
    pub peg_ratio: f64,
    pub return_on_equity: f64,
    pub profit_margin: f64,
    pub quarterly_earnings_growth_yoy: f64,
    pub beta: f64,
    pub dividend_yield: f64,
    pub price_to_book_ratio: f64,
    pub analyst_ratings: AnalystRatings,
    pub week_52_high: f64,
    pub week_52_low: f64,
    pub moving_average_50: f64,
    pub moving_average_200: f64,
    pub revenue_growth: Option<f64>,
    pub revenue_growth_5y: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

impl MetricsRecord {
    pub const DEFAULT_SECTOR: &'static str = "Unknown";
    /// Market beta; absence is treated as market-neutral.
    pub const DEFAULT_BETA: f64 = 1.0;

    /// Record with every metric at its default. `None` when the symbol is blank.
    pub fn new(symbol: &str) -> Option<Self> {
        let symbol = normalize_symbol(symbol)?;
        Some(Self {
            symbol,
            price: 0.0,
            sector: Self::DEFAULT_SECTOR.to_string(),
            pe_ratio: 0.0,
            peg_ratio: 0.0,
            return_on_equity: 0.0,
            profit_margin: 0.0,
            quarterly_earnings_growth_yoy: 0.0,
            beta: Self::DEFAULT_BETA,
            dividend_yield: 0.0,
            price_to_book_ratio: 0.0,
            analyst_ratings: AnalystRatings::default(),
            week_52_high: 0.0,
            week_52_low: 0.0,
            moving_average_50: 0.0,
            moving_average_200: 0.0,
            revenue_growth: None,
            revenue_growth_5y: None,
            debt_to_equity: None,
        })
    }

    /// True when any price-range, moving-average or analyst field carries data.
    pub fn has_technical_data(&self) -> bool {
        self.week_52_high > 0.0
            || self.week_52_low > 0.0
            || self.moving_average_50 > 0.0
            || self.moving_average_200 > 0.0
            || self.analyst_ratings.total() > 0
    }
}

/// Output of the normalizer: the canonical record plus the fields the
/// provider actually supplied (placeholders and missing keys excluded).
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMetrics {
    pub provider: ProviderKind,
    pub record: MetricsRecord,
    pub supplied: FieldSet,
}

/// Scoring strategy that produced a [`ScoreResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Technical + fundamental + analyst blend
    FullBlend,
    /// Revenue growth / P/E / dividend / debt blend
    FundamentalsOnly,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::FullBlend => "full_blend",
            StrategyKind::FundamentalsOnly => "fundamentals_only",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sub-scores of the full blend, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendSubScores {
    pub value: f64,
    pub growth: f64,
    pub profitability: f64,
    pub dividend: f64,
    pub risk: f64,
    pub stability: f64,
    pub sentiment: f64,
    pub range: f64,
    pub trend: f64,
}

/// Sub-scores of the fundamentals-only blend, each in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundamentalSubScores {
    pub revenue_growth: f64,
    pub revenue_growth_5y: f64,
    pub pe: f64,
    pub dividend: f64,
    pub debt: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ScoreBreakdown {
    FullBlend(BlendSubScores),
    FundamentalsOnly(FundamentalSubScores),
}

impl ScoreBreakdown {
    pub fn strategy(&self) -> StrategyKind {
        match self {
            ScoreBreakdown::FullBlend(_) => StrategyKind::FullBlend,
            ScoreBreakdown::FundamentalsOnly(_) => StrategyKind::FundamentalsOnly,
        }
    }

    /// Named sub-scores in a stable order. Absent optional sub-scores are skipped.
    pub fn components(&self) -> Vec<(&'static str, f64)> {
        match self {
            ScoreBreakdown::FullBlend(s) => vec![
                ("value", s.value),
                ("growth", s.growth),
                ("profitability", s.profitability),
                ("dividend", s.dividend),
                ("risk", s.risk),
                ("stability", s.stability),
                ("sentiment", s.sentiment),
                ("range", s.range),
                ("trend", s.trend),
            ],
            ScoreBreakdown::FundamentalsOnly(s) => {
                let mut out = vec![
                    ("revenue_growth", s.revenue_growth),
                    ("revenue_growth_5y", s.revenue_growth_5y),
                    ("pe", s.pe),
                    ("dividend", s.dividend),
                ];
                if let Some(debt) = s.debt {
                    out.push(("debt", debt));
                }
                out
            }
        }
    }
}

/// Scores derived from exactly one [`MetricsRecord`]. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub symbol: String,
    pub breakdown: ScoreBreakdown,
    /// Composite return score, 0 to 100
    pub roi_score: f64,
    /// Composite risk score, 0 to 100
    pub risk_score: f64,
}

impl ScoreResult {
    pub fn strategy(&self) -> StrategyKind {
        self.breakdown.strategy()
    }
}

/// One portfolio line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    /// Integer percentage of the portfolio
    pub weight: u32,
}

/// Ordered holdings, highest roi_score first.
///
/// Weights are truncated to integers, so the total is usually a few points
/// below 100.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortfolioAllocation {
    pub holdings: Vec<Holding>,
}

impl PortfolioAllocation {
    pub fn total_weight(&self) -> u32 {
        self.holdings.iter().map(|h| h.weight).sum()
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.holdings.iter().map(|h| h.symbol.as_str()).collect()
    }
}
