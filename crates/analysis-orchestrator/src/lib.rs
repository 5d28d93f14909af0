use analysis_core::{
    AnalysisError, CandidateAnalysis, MarketDataProvider, NarrativeGenerator, SentimentProvider,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub mod candidate;
pub mod comparison;
pub mod config;
pub mod price_target;
pub mod recommendation;
pub mod report;
pub mod symbols;

#[cfg(test)]
pub(crate) mod testing;

pub use candidate::CandidateAnalyzer;
pub use comparison::{compare, score_candidate, DeterministicRanking, NarrativeRanking, RankingStrategy};
pub use config::{AdvisorConfig, SymbolAliases};
pub use price_target::project_price_target;
pub use recommendation::{DeterministicRecommender, NarrativeRecommender, Recommender};
pub use report::AdvisorReport;
pub use symbols::{extract_symbols, is_valid_symbol, validate_symbols};

/// Runs the whole pipeline: validate, fan out per symbol, rank, recommend.
pub struct AnalysisOrchestrator {
    config: AdvisorConfig,
    market: Arc<dyn MarketDataProvider>,
    sentiment: Arc<dyn SentimentProvider>,
    narrative: Option<Arc<dyn NarrativeGenerator>>,
    aliases: SymbolAliases,
    ranking: Arc<dyn RankingStrategy>,
    recommender: Arc<dyn Recommender>,
}

impl AnalysisOrchestrator {
    pub fn new(
        config: AdvisorConfig,
        market: Arc<dyn MarketDataProvider>,
        sentiment: Arc<dyn SentimentProvider>,
    ) -> Self {
        Self {
            config,
            market,
            sentiment,
            narrative: None,
            aliases: SymbolAliases::default(),
            ranking: Arc::new(DeterministicRanking),
            recommender: Arc::new(DeterministicRecommender),
        }
    }

    /// Enable generated prose for risk scenarios, the comparison rationale and the
    /// recommendation. Deterministic results remain the fallback for each.
    pub fn with_narrative(mut self, narrative: Arc<dyn NarrativeGenerator>) -> Self {
        let timeout = self.config.call_timeout;
        self.ranking = Arc::new(NarrativeRanking::new(Arc::clone(&narrative), timeout));
        self.recommender = Arc::new(NarrativeRecommender::new(Arc::clone(&narrative), timeout));
        self.narrative = Some(narrative);
        self
    }

    pub fn with_aliases(mut self, aliases: SymbolAliases) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_ranking(mut self, ranking: Arc<dyn RankingStrategy>) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_recommender(mut self, recommender: Arc<dyn Recommender>) -> Self {
        self.recommender = recommender;
        self
    }

    pub fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Analyze explicit symbols.
    pub async fn run<S: AsRef<str>>(&self, symbols: &[S]) -> Result<AdvisorReport, AnalysisError> {
        let symbols = validate_symbols(symbols, self.config.max_symbols)?;
        self.run_validated(symbols).await
    }

    /// Analyze the symbols named in free text (cash-tags and known company names).
    pub async fn run_query(&self, text: &str) -> Result<AdvisorReport, AnalysisError> {
        let extracted = extract_symbols(text, &self.aliases, self.config.max_extracted_symbols)?;
        tracing::info!("Extracted symbols from query: {:?}", extracted);
        self.run(extracted.as_slice()).await
    }

    async fn run_validated(&self, symbols: Vec<String>) -> Result<AdvisorReport, AnalysisError> {
        tracing::info!("Starting analysis of {} symbols: {:?}", symbols.len(), symbols);

        let candidates = self.analyze_all(&symbols).await;

        if !candidates.iter().any(CandidateAnalysis::is_resolved) {
            return Err(AnalysisError::PipelineExhaustion(format!(
                "no market data could be retrieved for {}",
                symbols.join(", ")
            )));
        }

        let comparison = match self.ranking.rank(&candidates).await {
            Ok(comparison) => comparison,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!("Ranking strategy failed ({}); using deterministic comparison", e);
                compare(&candidates)?
            }
        };
        let selected = candidates
            .iter()
            .find(|c| c.symbol == comparison.best_symbol)
            .ok_or_else(|| {
                AnalysisError::Unknown(format!("selected symbol {} was not analyzed", comparison.best_symbol))
            })?;

        let recommendation = self
            .recommender
            .recommend(selected, &comparison, candidates.len())
            .await;

        tracing::info!(
            "Recommendation for {}: {:?} ({:?}), target {}",
            selected.symbol,
            recommendation.action,
            recommendation.confidence,
            recommendation.price_target
        );

        Ok(AdvisorReport {
            total_analyzed: candidates.len(),
            symbols,
            candidates,
            comparison,
            recommendation,
        })
    }

    /// One [`CandidateAnalysis`] per symbol, in input order.
    ///
    /// Units run concurrently, at most `concurrency` at a time. A unit that exceeds
    /// `candidate_timeout` or panics yields a fully degraded candidate. Dropping the
    /// returned future aborts all outstanding units.
    pub async fn analyze_all(&self, symbols: &[String]) -> Vec<CandidateAnalysis> {
        let analyzer = Arc::new(
            CandidateAnalyzer::new(
                Arc::clone(&self.market),
                Arc::clone(&self.sentiment),
                self.config.clone(),
            )
            .with_narrative(self.narrative.clone()),
        );
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let limit = self.config.candidate_timeout;

        let mut tasks = JoinSet::new();
        let mut task_symbols = HashMap::with_capacity(symbols.len());
        for (index, symbol) in symbols.iter().enumerate() {
            let analyzer = Arc::clone(&analyzer);
            let semaphore = Arc::clone(&semaphore);
            let owned = symbol.clone();
            let handle = tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let result = tokio::time::timeout(limit, analyzer.analyze(&owned)).await;
                (index, owned, result)
            });
            task_symbols.insert(handle.id(), symbol.as_str());
        }

        let mut slots: Vec<Option<CandidateAnalysis>> = vec![None; symbols.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, _, Ok(candidate))) => slots[index] = Some(candidate),
                Ok((_, symbol, Err(_))) => {
                    tracing::warn!(
                        "Analysis of {} exceeded {}s; using degraded result",
                        symbol,
                        limit.as_secs_f64()
                    );
                }
                Err(e) => {
                    let symbol = task_symbols.get(&e.id()).copied().unwrap_or("unknown symbol");
                    tracing::warn!("Analysis task for {} failed ({}); using degraded result", symbol, e);
                }
            }
        }

        slots
            .into_iter()
            .zip(symbols)
            .map(|(slot, symbol)| slot.unwrap_or_else(|| CandidateAnalysis::degraded(symbol)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use analysis_core::{Action, ComparisonResult, Confidence, PriceTarget, SentimentLabel};
    use async_trait::async_trait;
    use std::time::Duration;

    fn orchestrator(market: MockMarket, sentiment: MockSentiment) -> AnalysisOrchestrator {
        AnalysisOrchestrator::new(AdvisorConfig::default(), Arc::new(market), Arc::new(sentiment))
    }

    fn three_symbol_market() -> MockMarket {
        MockMarket::new()
            .with_symbol("AAPL", quote("AAPL", 190.0), rising_closes(60))
            .with_symbol("MSFT", quote("MSFT", 410.0), rising_closes(60))
            .with_symbol("NVDA", quote("NVDA", 120.0), rising_closes(60))
    }

    #[tokio::test]
    async fn test_all_symbols_failing_exhausts_pipeline() {
        let result = orchestrator(MockMarket::new(), MockSentiment::new())
            .run(&["AAA", "BBB", "CCC"])
            .await;
        assert!(matches!(result, Err(AnalysisError::PipelineExhaustion(_))));
    }

    #[tokio::test]
    async fn test_invalid_symbol_rejects_request() {
        let result = orchestrator(three_symbol_market(), MockSentiment::new())
            .run(&["AAPL", "not-a-ticker"])
            .await;
        assert!(matches!(result, Err(AnalysisError::Validation(_))));
    }

    #[tokio::test]
    async fn test_report_preserves_request_order() {
        let sentiment = MockSentiment::new().with("MSFT", SentimentLabel::Positive);
        let report = orchestrator(three_symbol_market(), sentiment)
            .run(&["nvda", "MSFT", "AAPL", "ZZZZ"])
            .await
            .unwrap();

        let order: Vec<_> = report.candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(order, vec!["NVDA", "MSFT", "AAPL", "ZZZZ"]);
        assert_eq!(report.symbols, vec!["NVDA", "MSFT", "AAPL", "ZZZZ"]);
        assert_eq!(report.total_analyzed, 4);
        assert!(!report.candidates[3].is_resolved());

        assert!(report.comparison.is_comparison);
        assert_eq!(report.comparison.best_symbol, "MSFT");
        assert!(report.comparison.alternatives.iter().all(|a| a.symbol != "MSFT"));
        assert_eq!(report.selected().map(|c| c.symbol.as_str()), Some("MSFT"));

        assert_eq!(report.recommendation.action, Action::Hold);
        assert_eq!(report.recommendation.confidence, Confidence::Medium);
        assert_eq!(report.recommendation.price_target, PriceTarget::Price(430.5));
    }

    #[tokio::test]
    async fn test_single_symbol_report() {
        let report = orchestrator(three_symbol_market(), MockSentiment::new())
            .run(&["AAPL"])
            .await
            .unwrap();
        assert!(!report.comparison.is_comparison);
        assert_eq!(report.comparison.rationale, "Analysis of AAPL completed.");
        assert_eq!(
            report.recommendation.rationale,
            "Analysis completed for AAPL. Recommendation based on current market conditions."
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_symbol_degrades_without_stalling_batch() {
        let config = AdvisorConfig {
            candidate_timeout: Duration::from_secs(5),
            ..AdvisorConfig::default()
        };
        let slow = MockMarket::new()
            .with_symbol("SLOW", quote("SLOW", 10.0), rising_closes(30))
            .with_delay(Duration::from_secs(10));

        let orchestrator = AnalysisOrchestrator::new(config, Arc::new(slow), Arc::new(MockSentiment::new()));
        let candidates = orchestrator.analyze_all(&["SLOW".to_string()]).await;
        assert_eq!(candidates, vec![CandidateAnalysis::degraded("SLOW")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_batch_keeps_request_order() {
        let config = AdvisorConfig {
            candidate_timeout: Duration::from_secs(5),
            ..AdvisorConfig::default()
        };
        // Completion order is CCC, BBB, AAA; BOOM panics and SLOW outlives the unit timeout.
        let market = MockMarket::new()
            .with_symbol("AAA", quote("AAA", 10.0), rising_closes(30))
            .with_symbol("BBB", quote("BBB", 20.0), rising_closes(30))
            .with_symbol("BOOM", quote("BOOM", 30.0), rising_closes(30))
            .with_symbol("CCC", quote("CCC", 40.0), rising_closes(30))
            .with_symbol("SLOW", quote("SLOW", 50.0), rising_closes(30))
            .with_symbol_delay("AAA", Duration::from_millis(300))
            .with_symbol_delay("BBB", Duration::from_millis(200))
            .with_symbol_delay("CCC", Duration::from_millis(10))
            .with_symbol_delay("SLOW", Duration::from_secs(60))
            .panicking_on("BOOM");

        let orchestrator = AnalysisOrchestrator::new(config, Arc::new(market), Arc::new(MockSentiment::new()));
        let symbols: Vec<String> = ["AAA", "BBB", "BOOM", "CCC", "SLOW"].iter().map(|s| s.to_string()).collect();
        let candidates = orchestrator.analyze_all(&symbols).await;

        let observed: Vec<_> = candidates.iter().map(|c| (c.symbol.as_str(), c.is_resolved())).collect();
        assert_eq!(
            observed,
            vec![("AAA", true), ("BBB", true), ("BOOM", false), ("CCC", true), ("SLOW", false)]
        );
        assert_eq!(candidates[2], CandidateAnalysis::degraded("BOOM"));
        assert_eq!(candidates[4], CandidateAnalysis::degraded("SLOW"));
        assert_eq!(candidates[3].fundamentals.price, Some(40.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_with_reversed_completion_order() {
        let market = MockMarket::new()
            .with_symbol("AAPL", quote("AAPL", 190.0), rising_closes(60))
            .with_symbol("MSFT", quote("MSFT", 410.0), rising_closes(60))
            .with_symbol("NVDA", quote("NVDA", 120.0), rising_closes(60))
            .with_symbol_delay("AAPL", Duration::from_secs(3))
            .with_symbol_delay("MSFT", Duration::from_secs(2))
            .with_symbol_delay("NVDA", Duration::from_secs(1));
        let sentiment = MockSentiment::new().with("AAPL", SentimentLabel::Positive);

        let report = orchestrator(market, sentiment).run(&["AAPL", "MSFT", "NVDA"]).await.unwrap();
        let order: Vec<_> = report.candidates.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(order, vec!["AAPL", "MSFT", "NVDA"]);
        assert_eq!(report.comparison.best_symbol, "AAPL");
        let alternatives: Vec<_> = report.comparison.alternatives.iter().map(|a| a.symbol.as_str()).collect();
        assert_eq!(alternatives, vec!["MSFT", "NVDA"]);
    }

    struct FailingRanking(AnalysisError);

    #[async_trait]
    impl RankingStrategy for FailingRanking {
        async fn rank(&self, _candidates: &[CandidateAnalysis]) -> Result<ComparisonResult, AnalysisError> {
            Err(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_non_fatal_ranking_error_falls_back() {
        let sentiment = MockSentiment::new().with("MSFT", SentimentLabel::Positive);
        let report = orchestrator(three_symbol_market(), sentiment)
            .with_ranking(Arc::new(FailingRanking(AnalysisError::Timeout("ranking".into()))))
            .run(&["AAPL", "MSFT"])
            .await
            .unwrap();
        assert_eq!(report.comparison, compare(&report.candidates).unwrap());
        assert_eq!(report.comparison.best_symbol, "MSFT");
    }

    #[tokio::test]
    async fn test_fatal_ranking_error_propagates() {
        let result = orchestrator(three_symbol_market(), MockSentiment::new())
            .with_ranking(Arc::new(FailingRanking(AnalysisError::Validation("rejected".into()))))
            .run(&["AAPL", "MSFT"])
            .await;
        assert_eq!(result.unwrap_err(), AnalysisError::Validation("rejected".into()));
    }

    #[tokio::test]
    async fn test_narrative_enrichment_keeps_deterministic_winner() {
        let sentiment = || MockSentiment::new().with("AAPL", SentimentLabel::Positive);
        let deterministic = orchestrator(three_symbol_market(), sentiment())
            .run(&["MSFT", "AAPL"])
            .await
            .unwrap();

        let report = orchestrator(three_symbol_market(), sentiment())
            .with_narrative(Arc::new(MockNarrative::default()))
            .run(&["MSFT", "AAPL"])
            .await
            .unwrap();

        assert_eq!(report.comparison.best_symbol, deterministic.comparison.best_symbol);
        assert_eq!(report.comparison.scores, deterministic.comparison.scores);
        assert_eq!(report.comparison.rationale, "Narrative rationale for AAPL");
        assert_eq!(report.candidates[1].risk.scenario_analysis, "Scenario prose for AAPL");
        assert_eq!(report.recommendation.action, Action::Buy);
        assert_eq!(report.recommendation.price_target, PriceTarget::Price(228.0));
    }

    #[tokio::test]
    async fn test_run_query_uses_aliases() {
        let report = orchestrator(three_symbol_market(), MockSentiment::new())
            .with_aliases(SymbolAliases::from_pairs([("CUPERTINO", "AAPL")]))
            .run_query("compare cupertino with $nvda")
            .await
            .unwrap();
        assert_eq!(report.symbols, vec!["AAPL", "NVDA"]);
    }

    #[tokio::test]
    async fn test_query_without_symbols_is_rejected() {
        let result = orchestrator(three_symbol_market(), MockSentiment::new())
            .run_query("what should I buy today?")
            .await;
        assert!(matches!(result, Err(AnalysisError::Validation(_))));
    }
}
