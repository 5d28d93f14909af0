use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::numeric::format_market_cap;

/// Chronological daily closing prices for one symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries(Vec<f64>);

impl PriceSeries {
    /// Build a series, dropping non-finite closes the provider may have left in.
    pub fn new(closes: Vec<f64>) -> Self {
        Self(closes.into_iter().filter(|c| c.is_finite()).collect())
    }

    pub fn closes(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.0.last().copied()
    }
}

impl From<Vec<f64>> for PriceSeries {
    fn from(closes: Vec<f64>) -> Self {
        Self::new(closes)
    }
}

/// Direction of the price trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall tone of recent news
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    #[default]
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }

    /// Lenient parse of free-form labels ("Positive", " bearish ", ...). Unknown text is neutral.
    pub fn parse_lenient(text: &str) -> Self {
        match text.trim().to_lowercase().as_str() {
            "positive" | "bullish" => SentimentLabel::Positive,
            "negative" | "bearish" => SentimentLabel::Negative,
            _ => SentimentLabel::Neutral,
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static valuation snapshot. Every numeric field is optional: `None` means unknown, never zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fundamentals {
    pub symbol: String,
    pub company_name: Option<String>,
    pub exchange: Option<String>,
    pub price: Option<f64>,
    pub price_change: Option<f64>,
    pub price_change_percent: Option<f64>,
    pub market_cap: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub eps: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub beta: Option<f64>,
    pub volume: Option<u64>,
    pub avg_volume: Option<u64>,
    pub day_range: Option<String>,
    pub year_range: Option<String>,
}

impl Fundamentals {
    /// Degraded snapshot used when the provider could not be reached.
    pub fn unknown(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            company_name: Some(symbol.to_string()),
            ..Default::default()
        }
    }

    pub fn display_name(&self) -> &str {
        self.company_name.as_deref().unwrap_or(&self.symbol)
    }

    pub fn market_cap_display(&self) -> Option<String> {
        self.market_cap.filter(|v| v.is_finite()).map(format_market_cap)
    }
}

/// MACD line, signal and histogram at the latest close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacdSnapshot {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Technical indicators computed from one price series.
///
/// An `IndicatorSet` with every field absent means "indicators unavailable" for
/// the symbol; it is a value, not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSet {
    pub latest_close: Option<f64>,
    /// Window length to SMA value. Windows longer than the series are absent.
    pub sma: BTreeMap<usize, f64>,
    pub rsi: Option<f64>,
    pub macd: Option<MacdSnapshot>,
    pub trend: Option<Trend>,
    pub signals: Vec<String>,
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

impl IndicatorSet {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_available(&self) -> bool {
        self.latest_close.is_some()
    }

    pub fn sma(&self, window: usize) -> Option<f64> {
        self.sma.get(&window).copied()
    }

    pub fn trend_or_neutral(&self) -> Trend {
        self.trend.unwrap_or_default()
    }
}

pub const RISK_UNAVAILABLE: &str = "Risk assessment unavailable";

/// Volatility statistics and heuristic gain/loss bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    /// Annualized volatility of daily returns, percent
    pub volatility: Option<f64>,
    /// Annualized deviation of negative daily returns, percent
    pub downside_risk: Option<f64>,
    pub beta: Option<f64>,
    pub probability_gain: Option<f64>,
    pub probability_loss: Option<f64>,
    pub scenario_analysis: String,
}

impl RiskProfile {
    pub fn unavailable(beta: Option<f64>) -> Self {
        Self {
            volatility: None,
            downside_risk: None,
            beta,
            probability_gain: None,
            probability_loss: None,
            scenario_analysis: RISK_UNAVAILABLE.to_string(),
        }
    }
}

/// News headline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headline {
    pub title: String,
    pub publisher: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

impl Headline {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            publisher: None,
            link: None,
            published: None,
        }
    }
}

pub const SENTIMENT_FAILED: &str = "Analysis failed";
pub const NO_HEADLINES: &str = "No recent headlines available.";

/// Sentiment for one symbol, derived from its recent headlines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentReport {
    pub label: SentimentLabel,
    pub summary: String,
    pub headlines: Vec<Headline>,
    #[serde(default)]
    pub regulatory_changes: Vec<String>,
    #[serde(default)]
    pub product_launches: Vec<String>,
    #[serde(default)]
    pub leadership_changes: Vec<String>,
}

impl SentimentReport {
    /// Substituted when the sentiment provider fails.
    pub fn degraded() -> Self {
        Self::neutral(SENTIMENT_FAILED)
    }

    pub fn no_headlines() -> Self {
        Self::neutral(NO_HEADLINES)
    }

    fn neutral(summary: &str) -> Self {
        Self {
            label: SentimentLabel::Neutral,
            summary: summary.to_string(),
            headlines: Vec::new(),
            regulatory_changes: Vec::new(),
            product_launches: Vec::new(),
            leadership_changes: Vec::new(),
        }
    }
}

/// Which sub-fetches of a candidate analysis actually reached their provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataCoverage {
    pub fundamentals: bool,
    pub price_history: bool,
    pub sentiment: bool,
}

/// Everything known about one candidate symbol in a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateAnalysis {
    pub symbol: String,
    pub fundamentals: Fundamentals,
    pub indicators: IndicatorSet,
    pub risk: RiskProfile,
    pub sentiment: SentimentReport,
    pub coverage: DataCoverage,
}

impl CandidateAnalysis {
    /// A candidate with every sub-result replaced by its documented default.
    pub fn degraded(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            fundamentals: Fundamentals::unknown(symbol),
            indicators: IndicatorSet::unavailable(),
            risk: RiskProfile::unavailable(None),
            sentiment: SentimentReport::degraded(),
            coverage: DataCoverage::default(),
        }
    }

    /// True when market data (fundamentals or price history) was obtained for the symbol.
    pub fn is_resolved(&self) -> bool {
        self.coverage.fundamentals || self.coverage.price_history
    }

    pub fn trend(&self) -> Trend {
        self.indicators.trend_or_neutral()
    }

    pub fn sentiment_label(&self) -> SentimentLabel {
        self.sentiment.label
    }

    pub fn sentiment_summary(&self) -> &str {
        &self.sentiment.summary
    }
}

/// A non-selected candidate, annotated for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
    pub symbol: String,
    pub company_name: String,
    pub price: Option<f64>,
    pub market_cap: Option<String>,
    pub trend: Trend,
    pub sentiment: SentimentLabel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateScore {
    pub symbol: String,
    pub score: u32,
}

/// Outcome of comparing the analyzed candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub best_symbol: String,
    pub is_comparison: bool,
    pub rationale: String,
    pub ranking_factors: Vec<String>,
    pub alternatives: Vec<Alternative>,
    pub scores: Vec<CandidateScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Hold,
    Sell,
}

impl Action {
    pub fn parse_lenient(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "buy" | "strong buy" => Some(Action::Buy),
            "hold" => Some(Action::Hold),
            "sell" | "strong sell" => Some(Action::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn parse_lenient(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" | "moderate" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

pub const PRICE_TARGET_UNAVAILABLE: &str = "Not available";

/// Projected price, or an explicit marker when the current price is unknown.
///
/// Serializes as a bare number or as the string `"Not available"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceTarget {
    Price(f64),
    NotAvailable,
}

impl PriceTarget {
    pub fn value(&self) -> Option<f64> {
        match self {
            PriceTarget::Price(p) => Some(*p),
            PriceTarget::NotAvailable => None,
        }
    }
}

impl fmt::Display for PriceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceTarget::Price(p) => write!(f, "{:.2}", p),
            PriceTarget::NotAvailable => f.write_str(PRICE_TARGET_UNAVAILABLE),
        }
    }
}

impl Serialize for PriceTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PriceTarget::Price(p) => serializer.serialize_f64(*p),
            PriceTarget::NotAvailable => serializer.serialize_str(PRICE_TARGET_UNAVAILABLE),
        }
    }
}

impl<'de> Deserialize<'de> for PriceTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(p) => PriceTarget::Price(p),
            Raw::Text(text) => text
                .trim()
                .trim_start_matches('$')
                .parse::<f64>()
                .map(PriceTarget::Price)
                .unwrap_or(PriceTarget::NotAvailable),
        })
    }
}

/// Final investment call for the selected candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub action: Action,
    pub confidence: Confidence,
    pub rationale: String,
    pub key_risks: Vec<String>,
    pub key_opportunities: Vec<String>,
    pub time_horizon: String,
    pub price_target: PriceTarget,
}

/// Recommendation fields proposed by the narrative generator, before validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NarrativeRecommendation {
    pub action: String,
    pub confidence: String,
    pub rationale: String,
    pub key_risks: Vec<String>,
    pub key_opportunities: Vec<String>,
    pub time_horizon: String,
}
