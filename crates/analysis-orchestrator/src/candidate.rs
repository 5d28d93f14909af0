use analysis_core::{
    AnalysisError, CandidateAnalysis, DataCoverage, Fundamentals, IndicatorSet, MarketDataProvider,
    NarrativeGenerator, PriceSeries, RiskProfile, SentimentProvider, SentimentReport,
};
use quant_analysis::QuantAnalysisEngine;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use technical_analysis::TechnicalAnalysisEngine;

use crate::config::AdvisorConfig;

/// Await `fut`, converting an elapsed deadline into [`AnalysisError::Timeout`].
pub(crate) async fn with_timeout<T, F>(
    limit: Duration,
    what: &str,
    symbol: &str,
    fut: F,
) -> Result<T, AnalysisError>
where
    F: Future<Output = Result<T, AnalysisError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AnalysisError::Timeout(format!(
            "{} for {} exceeded {}s",
            what,
            symbol,
            limit.as_secs_f64()
        ))),
    }
}

/// Builds one [`CandidateAnalysis`] per symbol.
///
/// The four sub-results are fetched concurrently and fail independently; each
/// failure is replaced by its degraded default, so `analyze` never returns an error.
pub struct CandidateAnalyzer {
    market: Arc<dyn MarketDataProvider>,
    sentiment: Arc<dyn SentimentProvider>,
    narrative: Option<Arc<dyn NarrativeGenerator>>,
    technical: TechnicalAnalysisEngine,
    quant: QuantAnalysisEngine,
    config: AdvisorConfig,
}

impl CandidateAnalyzer {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        sentiment: Arc<dyn SentimentProvider>,
        config: AdvisorConfig,
    ) -> Self {
        Self {
            market,
            sentiment,
            narrative: None,
            technical: TechnicalAnalysisEngine::new(),
            quant: QuantAnalysisEngine::new(),
            config,
        }
    }

    pub fn with_narrative(mut self, narrative: Option<Arc<dyn NarrativeGenerator>>) -> Self {
        self.narrative = narrative;
        self
    }

    pub async fn analyze(&self, symbol: &str) -> CandidateAnalysis {
        let limit = self.config.call_timeout;

        let (fundamentals_res, technical_res, risk_res, sentiment_res) = tokio::join!(
            with_timeout(limit, "fundamentals", symbol, self.market.fetch_fundamentals(symbol)),
            with_timeout(
                limit,
                "technical price history",
                symbol,
                self.market.fetch_price_series(symbol, self.config.technical_lookback_days),
            ),
            with_timeout(
                limit,
                "risk price history",
                symbol,
                self.market.fetch_price_series(symbol, self.config.risk_lookback_days),
            ),
            with_timeout(limit, "sentiment", symbol, self.sentiment.fetch_sentiment(symbol)),
        );

        let mut coverage = DataCoverage::default();

        let fundamentals = match fundamentals_res {
            Ok(f) => {
                coverage.fundamentals = true;
                f
            }
            Err(e) => {
                tracing::warn!("Fundamentals unavailable for {}: {}", symbol, e);
                Fundamentals::unknown(symbol)
            }
        };

        let indicators = match technical_res {
            Ok(series) => {
                coverage.price_history = true;
                self.technical.analyze(&series)
            }
            Err(e) => {
                tracing::warn!("Technical indicators unavailable for {}: {}", symbol, e);
                IndicatorSet::unavailable()
            }
        };

        let risk = match risk_res {
            Ok(series) => {
                coverage.price_history = true;
                self.assess_risk(symbol, &series, &fundamentals).await
            }
            Err(e) => {
                tracing::warn!("Risk assessment unavailable for {}: {}", symbol, e);
                RiskProfile::unavailable(fundamentals.beta)
            }
        };

        let sentiment = match sentiment_res {
            Ok(report) => {
                coverage.sentiment = true;
                report
            }
            Err(e) => {
                tracing::warn!("Sentiment unavailable for {}: {}", symbol, e);
                SentimentReport::degraded()
            }
        };

        tracing::info!(
            "Analyzed {} (fundamentals: {}, prices: {}, sentiment: {})",
            symbol,
            coverage.fundamentals,
            coverage.price_history,
            coverage.sentiment
        );

        CandidateAnalysis {
            symbol: symbol.to_string(),
            fundamentals,
            indicators,
            risk,
            sentiment,
            coverage,
        }
    }

    /// Deterministic statistics, with the scenario text replaced by narrative prose when available.
    async fn assess_risk(
        &self,
        symbol: &str,
        series: &PriceSeries,
        fundamentals: &Fundamentals,
    ) -> RiskProfile {
        let mut profile = self.quant.assess(series, fundamentals);

        if let Some(narrative) = &self.narrative {
            let prose = with_timeout(
                self.config.call_timeout,
                "risk narrative",
                symbol,
                narrative.narrate_risk(symbol, fundamentals),
            )
            .await;
            match prose {
                Ok(text) if !text.trim().is_empty() => profile.scenario_analysis = text,
                Ok(_) => tracing::warn!("Empty risk narrative for {}", symbol),
                Err(e) => tracing::warn!("Risk narrative unavailable for {}: {}", symbol, e),
            }
        }
        profile
    }
}
