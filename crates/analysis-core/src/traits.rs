use async_trait::async_trait;
use crate::{
    AnalysisError, CandidateAnalysis, ComparisonResult, Fundamentals, Headline,
    NarrativeRecommendation, PriceSeries, SentimentReport,
};

/// Source of quotes, valuation data and daily closes
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError>;

    /// Chronological daily closes covering roughly the last `lookback_days` calendar days.
    async fn fetch_price_series(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, AnalysisError>;
}

/// Source of recent news headlines
#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_headlines(
        &self,
        symbol: &str,
        max_items: usize,
    ) -> Result<Vec<Headline>, AnalysisError>;
}

/// Trait for sentiment analysis engines
#[async_trait]
pub trait SentimentProvider: Send + Sync {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentReport, AnalysisError>;
}

/// Generates prose around decisions made by the deterministic pipeline.
///
/// Every method may fail; callers fall back to deterministic text.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn summarize_rationale(
        &self,
        candidates: &[CandidateAnalysis],
        selection: &ComparisonResult,
    ) -> Result<String, AnalysisError>;

    async fn narrate_risk(
        &self,
        symbol: &str,
        fundamentals: &Fundamentals,
    ) -> Result<String, AnalysisError>;

    async fn propose_recommendation(
        &self,
        selected: &CandidateAnalysis,
        comparison: &ComparisonResult,
    ) -> Result<NarrativeRecommendation, AnalysisError>;
}
