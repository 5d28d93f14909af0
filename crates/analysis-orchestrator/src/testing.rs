//! In-memory providers and builders shared by the unit tests.

use analysis_core::{
    AnalysisError, CandidateAnalysis, ComparisonResult, DataCoverage, Fundamentals,
    MarketDataProvider, NarrativeGenerator, NarrativeRecommendation, PriceSeries, SentimentLabel,
    SentimentProvider, SentimentReport, Trend,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub fn quote(symbol: &str, price: f64) -> Fundamentals {
    Fundamentals {
        symbol: symbol.to_string(),
        company_name: Some(format!("{} Corp", symbol)),
        price: Some(price),
        beta: Some(1.1),
        ..Default::default()
    }
}

pub fn rising_closes(n: usize) -> Vec<f64> {
    (0..n).map(|i| 100.0 + i as f64).collect()
}

#[derive(Clone, Default)]
pub struct MockMarket {
    quotes: HashMap<String, Fundamentals>,
    closes: HashMap<String, Vec<f64>>,
    fail_prices: bool,
    delay: Option<Duration>,
    symbol_delays: HashMap<String, Duration>,
    panic_on: Option<String>,
}

impl MockMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: &str, fundamentals: Fundamentals, closes: Vec<f64>) -> Self {
        self.quotes.insert(symbol.to_string(), fundamentals);
        self.closes.insert(symbol.to_string(), closes);
        self
    }

    pub fn failing_prices(mut self) -> Self {
        self.fail_prices = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_symbol_delay(mut self, symbol: &str, delay: Duration) -> Self {
        self.symbol_delays.insert(symbol.to_string(), delay);
        self
    }

    pub fn panicking_on(mut self, symbol: &str) -> Self {
        self.panic_on = Some(symbol.to_string());
        self
    }

    async fn pause(&self, symbol: &str) {
        if self.panic_on.as_deref() == Some(symbol) {
            panic!("market data for {} is corrupt", symbol);
        }
        if let Some(delay) = self.symbol_delays.get(symbol).copied().or(self.delay) {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl MarketDataProvider for MockMarket {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError> {
        self.pause(symbol).await;
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| AnalysisError::ExternalService(format!("no quote for {}", symbol)))
    }

    async fn fetch_price_series(&self, symbol: &str, _lookback_days: u32) -> Result<PriceSeries, AnalysisError> {
        self.pause(symbol).await;
        if self.fail_prices {
            return Err(AnalysisError::ExternalService("chart endpoint down".to_string()));
        }
        self.closes
            .get(symbol)
            .map(|c| PriceSeries::new(c.clone()))
            .ok_or_else(|| AnalysisError::ExternalService(format!("no chart for {}", symbol)))
    }
}

#[derive(Default)]
pub struct MockSentiment {
    labels: HashMap<String, SentimentLabel>,
    fail: bool,
}

impl MockSentiment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn with(mut self, symbol: &str, label: SentimentLabel) -> Self {
        self.labels.insert(symbol.to_string(), label);
        self
    }
}

#[async_trait]
impl SentimentProvider for MockSentiment {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentReport, AnalysisError> {
        if self.fail {
            return Err(AnalysisError::ExternalService("news search down".to_string()));
        }
        Ok(match self.labels.get(symbol) {
            Some(label) => SentimentReport {
                label: *label,
                summary: format!("{} headlines read {}", symbol, label),
                ..SentimentReport::no_headlines()
            },
            None => SentimentReport::no_headlines(),
        })
    }
}

#[derive(Default)]
pub struct MockNarrative {
    fail: bool,
    rationale: Option<String>,
    recommendation: Option<NarrativeRecommendation>,
    rationale_calls: Arc<AtomicUsize>,
}

impl MockNarrative {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn with_rationale(mut self, text: &str) -> Self {
        self.rationale = Some(text.to_string());
        self
    }

    pub fn with_recommendation(mut self, proposal: NarrativeRecommendation) -> Self {
        self.recommendation = Some(proposal);
        self
    }

    pub fn rationale_calls(&self) -> usize {
        self.rationale_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), AnalysisError> {
        if self.fail {
            Err(AnalysisError::ExternalService("generation service returned 503".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NarrativeGenerator for MockNarrative {
    async fn summarize_rationale(
        &self,
        _candidates: &[CandidateAnalysis],
        selection: &ComparisonResult,
    ) -> Result<String, AnalysisError> {
        self.rationale_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self
            .rationale
            .clone()
            .unwrap_or_else(|| format!("Narrative rationale for {}", selection.best_symbol)))
    }

    async fn narrate_risk(&self, symbol: &str, _fundamentals: &Fundamentals) -> Result<String, AnalysisError> {
        self.check()?;
        Ok(format!("Scenario prose for {}", symbol))
    }

    async fn propose_recommendation(
        &self,
        selected: &CandidateAnalysis,
        _comparison: &ComparisonResult,
    ) -> Result<NarrativeRecommendation, AnalysisError> {
        self.check()?;
        Ok(self.recommendation.clone().unwrap_or_else(|| NarrativeRecommendation {
            action: "Buy".to_string(),
            confidence: "High".to_string(),
            rationale: format!("Narrative recommendation for {}", selected.symbol),
            ..Default::default()
        }))
    }
}

/// Builder for fully-resolved candidates with selected fields set.
pub struct CandidateBuilder(CandidateAnalysis);

pub fn candidate(symbol: &str) -> CandidateBuilder {
    let mut c = CandidateAnalysis::degraded(symbol);
    c.sentiment = SentimentReport::no_headlines();
    c.coverage = DataCoverage { fundamentals: true, price_history: true, sentiment: true };
    CandidateBuilder(c)
}

impl CandidateBuilder {
    pub fn trend(mut self, trend: Trend) -> Self {
        self.0.indicators.trend = Some(trend);
        self
    }

    pub fn sentiment(mut self, label: SentimentLabel) -> Self {
        self.0.sentiment.label = label;
        self
    }

    pub fn signals(mut self, signals: &[&str]) -> Self {
        self.0.indicators.signals = signals.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn price(mut self, price: f64) -> Self {
        self.0.fundamentals.price = Some(price);
        self
    }

    pub fn pe(mut self, pe: f64) -> Self {
        self.0.fundamentals.pe_ratio = Some(pe);
        self
    }

    pub fn volatility(mut self, volatility: f64) -> Self {
        self.0.risk.volatility = Some(volatility);
        self
    }

    pub fn change_pct(mut self, pct: f64) -> Self {
        self.0.fundamentals.price_change_percent = Some(pct);
        self
    }

    pub fn debt(mut self, ratio: f64) -> Self {
        self.0.fundamentals.debt_ratio = Some(ratio);
        self
    }

    pub fn build(self) -> CandidateAnalysis {
        self.0
    }
}
