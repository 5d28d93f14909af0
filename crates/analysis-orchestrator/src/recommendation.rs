use analysis_core::{
    Action, AnalysisError, CandidateAnalysis, ComparisonResult, Confidence, NarrativeGenerator,
    NarrativeRecommendation, Recommendation, SentimentLabel,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::candidate::with_timeout;
use crate::price_target::project_price_target;

const GENERIC_RISKS: [&str; 3] = ["Market volatility", "Economic uncertainty", "Sector-specific risks"];
const GENERIC_OPPORTUNITIES: [&str; 3] = ["Growth potential", "Market position", "Financial strength"];
const DEFAULT_HORIZON: &str = "Medium-term";
const MAX_POINTS: usize = 3;

/// Produces the final [`Recommendation`] for the selected candidate.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(
        &self,
        selected: &CandidateAnalysis,
        comparison: &ComparisonResult,
        total_analyzed: usize,
    ) -> Recommendation;
}

fn deterministic_rationale(
    selected: &CandidateAnalysis,
    comparison: &ComparisonResult,
    total_analyzed: usize,
) -> String {
    if comparison.is_comparison {
        format!(
            "{} selected as best option among {} stocks. {}",
            comparison.best_symbol, total_analyzed, comparison.rationale
        )
    } else {
        format!(
            "Analysis completed for {}. Recommendation based on current market conditions.",
            selected.symbol
        )
    }
}

fn risks_from_signals(c: &CandidateAnalysis) -> Vec<String> {
    let mut risks = Vec::new();
    for signal in &c.indicators.signals {
        let risk = match signal.as_str() {
            "Price below 20-day SMA" => "Price trading below its 20-day average",
            "20-day SMA below 50-day SMA" => "Short-term average below the 50-day average",
            "RSI overbought (>70)" => "Overbought momentum may reverse",
            "MACD bearish crossover" => "Bearish MACD momentum",
            "Three black crows pattern" => "Three consecutive lower closes",
            _ => continue,
        };
        risks.push(risk.to_string());
    }
    if let Some(v) = c.risk.volatility.filter(|v| *v >= 40.0) {
        risks.push(format!("High volatility ({:.2}% annualized)", v));
    }
    if let Some(pe) = c.fundamentals.pe_ratio.filter(|pe| *pe > 30.0) {
        risks.push(format!("Elevated valuation (P/E {:.1})", pe));
    }
    if let Some(d) = c.fundamentals.debt_ratio.filter(|d| *d > 0.6) {
        risks.push(format!("High leverage (debt ratio {:.3})", d));
    }
    if c.sentiment_label() == SentimentLabel::Negative {
        risks.push("Negative news sentiment".to_string());
    }
    risks
}

fn opportunities_from_signals(c: &CandidateAnalysis) -> Vec<String> {
    let mut opportunities = Vec::new();
    for signal in &c.indicators.signals {
        let opportunity = match signal.as_str() {
            "Price above 20-day SMA" => "Price trading above its 20-day average",
            "20-day SMA above 50-day SMA" => "Short-term average above the 50-day average",
            "RSI oversold (<30)" => "Oversold conditions may offer an entry point",
            "MACD bullish crossover" => "Bullish MACD momentum",
            "Three white soldiers pattern" => "Three consecutive higher closes",
            _ => continue,
        };
        opportunities.push(opportunity.to_string());
    }
    if let Some(pe) = c.fundamentals.pe_ratio.filter(|pe| *pe > 0.0 && *pe < 16.0) {
        opportunities.push(format!("Attractive valuation (P/E {:.1})", pe));
    }
    if c.sentiment_label() == SentimentLabel::Positive {
        opportunities.push("Positive news sentiment".to_string());
    }
    if let Some(d) = c.fundamentals.debt_ratio.filter(|d| *d < 0.5) {
        opportunities.push(format!("Conservative balance sheet (debt ratio {:.3})", d));
    }
    opportunities
}

fn or_generic(mut points: Vec<String>, generic: &[&str]) -> Vec<String> {
    if points.is_empty() {
        return generic.iter().map(|s| s.to_string()).collect();
    }
    points.truncate(MAX_POINTS);
    points
}

/// Hold / Medium / Medium-term with signal-derived risks and opportunities.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicRecommender;

impl DeterministicRecommender {
    pub fn build(
        &self,
        selected: &CandidateAnalysis,
        comparison: &ComparisonResult,
        total_analyzed: usize,
    ) -> Recommendation {
        let action = Action::Hold;
        Recommendation {
            action,
            confidence: Confidence::Medium,
            rationale: deterministic_rationale(selected, comparison, total_analyzed),
            key_risks: or_generic(risks_from_signals(selected), &GENERIC_RISKS),
            key_opportunities: or_generic(opportunities_from_signals(selected), &GENERIC_OPPORTUNITIES),
            time_horizon: DEFAULT_HORIZON.to_string(),
            price_target: project_price_target(
                action,
                selected.fundamentals.price,
                selected.trend(),
                selected.fundamentals.pe_ratio,
            ),
        }
    }
}

#[async_trait]
impl Recommender for DeterministicRecommender {
    async fn recommend(
        &self,
        selected: &CandidateAnalysis,
        comparison: &ComparisonResult,
        total_analyzed: usize,
    ) -> Recommendation {
        self.build(selected, comparison, total_analyzed)
    }
}

/// Merge a generated proposal over the deterministic recommendation.
///
/// The action must parse; other fields fall back individually. The price target is
/// always re-projected from the final action.
pub fn merge_proposal(
    proposal: NarrativeRecommendation,
    fallback: Recommendation,
    selected: &CandidateAnalysis,
) -> Result<Recommendation, AnalysisError> {
    let action = Action::parse_lenient(&proposal.action).ok_or_else(|| {
        AnalysisError::NarrativeParse(format!("unrecognized action {:?}", proposal.action))
    })?;

    let clean = |items: Vec<String>| -> Vec<String> {
        items
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };
    let key_risks = clean(proposal.key_risks);
    let key_opportunities = clean(proposal.key_opportunities);

    Ok(Recommendation {
        action,
        confidence: Confidence::parse_lenient(&proposal.confidence).unwrap_or(fallback.confidence),
        rationale: if proposal.rationale.trim().is_empty() {
            fallback.rationale
        } else {
            proposal.rationale.trim().to_string()
        },
        key_risks: if key_risks.is_empty() { fallback.key_risks } else { key_risks },
        key_opportunities: if key_opportunities.is_empty() {
            fallback.key_opportunities
        } else {
            key_opportunities
        },
        time_horizon: if proposal.time_horizon.trim().is_empty() {
            fallback.time_horizon
        } else {
            proposal.time_horizon.trim().to_string()
        },
        price_target: project_price_target(
            action,
            selected.fundamentals.price,
            selected.trend(),
            selected.fundamentals.pe_ratio,
        ),
    })
}

/// Asks the narrative generator for a proposal, falling back to [`DeterministicRecommender`].
pub struct NarrativeRecommender {
    narrative: Arc<dyn NarrativeGenerator>,
    timeout: Duration,
    fallback: DeterministicRecommender,
}

impl NarrativeRecommender {
    pub fn new(narrative: Arc<dyn NarrativeGenerator>, timeout: Duration) -> Self {
        Self {
            narrative,
            timeout,
            fallback: DeterministicRecommender,
        }
    }
}

#[async_trait]
impl Recommender for NarrativeRecommender {
    async fn recommend(
        &self,
        selected: &CandidateAnalysis,
        comparison: &ComparisonResult,
        total_analyzed: usize,
    ) -> Recommendation {
        let fallback = self.fallback.build(selected, comparison, total_analyzed);

        let proposal = with_timeout(
            self.timeout,
            "recommendation narrative",
            &selected.symbol,
            self.narrative.propose_recommendation(selected, comparison),
        )
        .await;

        match proposal.and_then(|p| merge_proposal(p, fallback.clone(), selected)) {
            Ok(recommendation) => recommendation,
            Err(e) => {
                tracing::warn!("Using deterministic recommendation for {}: {}", selected.symbol, e);
                fallback
            }
        }
    }
}
