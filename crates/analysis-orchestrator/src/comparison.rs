use analysis_core::{
    AnalysisError, Alternative, CandidateAnalysis, CandidateScore, ComparisonResult,
    NarrativeGenerator, SentimentLabel, Trend,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::candidate::with_timeout;

pub const RANKING_FACTORS: [&str; 3] = ["Technical Analysis", "Fundamental Strength", "Risk Assessment"];

/// Deterministic multi-criteria score, 0..=100.
pub fn score_candidate(candidate: &CandidateAnalysis) -> u32 {
    let f = &candidate.fundamentals;
    let mut score = 0;

    if candidate.trend() == Trend::Bullish {
        score += 30;
    }
    if candidate.sentiment_label() == SentimentLabel::Positive {
        score += 20;
    }
    if f.pe_ratio.is_some_and(|pe| pe < 25.0) {
        score += 15;
    }
    if candidate.risk.volatility.is_some_and(|v| v < 30.0) {
        score += 15;
    }
    if f.price_change_percent.is_some_and(|pct| pct > 0.0) {
        score += 10;
    }
    if f.debt_ratio.is_some_and(|d| d < 0.5) {
        score += 10;
    }
    score
}

fn alternative(candidate: &CandidateAnalysis) -> Alternative {
    Alternative {
        symbol: candidate.symbol.clone(),
        company_name: candidate.fundamentals.display_name().to_string(),
        price: candidate.fundamentals.price,
        market_cap: candidate.fundamentals.market_cap_display(),
        trend: candidate.trend(),
        sentiment: candidate.sentiment_label(),
    }
}

/// Select the best candidate.
///
/// A single candidate is selected trivially. With two or more the highest score wins and
/// ties go to the candidate listed first.
pub fn compare(candidates: &[CandidateAnalysis]) -> Result<ComparisonResult, AnalysisError> {
    let first = candidates
        .first()
        .ok_or_else(|| AnalysisError::Validation("no candidates to compare".to_string()))?;

    let scores: Vec<CandidateScore> = candidates
        .iter()
        .map(|c| CandidateScore {
            symbol: c.symbol.clone(),
            score: score_candidate(c),
        })
        .collect();

    if candidates.len() == 1 {
        return Ok(ComparisonResult {
            best_symbol: first.symbol.clone(),
            is_comparison: false,
            rationale: format!("Analysis of {} completed.", first.symbol),
            ranking_factors: Vec::new(),
            alternatives: Vec::new(),
            scores,
        });
    }

    let mut best_index = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        if s.score > scores[best_index].score {
            best_index = i;
        }
    }
    let best = &candidates[best_index];

    tracing::info!(
        "Selected {} with score {} among {} candidates",
        best.symbol,
        scores[best_index].score,
        candidates.len()
    );

    Ok(ComparisonResult {
        best_symbol: best.symbol.clone(),
        is_comparison: true,
        rationale: format!(
            "{} emerged as the best choice based on a combination of technical trend ({}), \
             news sentiment ({}), and fundamental metrics. This stock scored highest across \
             multiple evaluation criteria.",
            best.symbol,
            best.trend(),
            best.sentiment_label()
        ),
        ranking_factors: RANKING_FACTORS.iter().map(|s| s.to_string()).collect(),
        alternatives: candidates
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != best_index)
            .map(|(_, c)| alternative(c))
            .collect(),
        scores,
    })
}

/// Strategy that turns analyzed candidates into a [`ComparisonResult`]
#[async_trait]
pub trait RankingStrategy: Send + Sync {
    async fn rank(&self, candidates: &[CandidateAnalysis]) -> Result<ComparisonResult, AnalysisError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DeterministicRanking;

#[async_trait]
impl RankingStrategy for DeterministicRanking {
    async fn rank(&self, candidates: &[CandidateAnalysis]) -> Result<ComparisonResult, AnalysisError> {
        compare(candidates)
    }
}

/// Deterministic selection annotated with generated prose.
///
/// Only the rationale can change; on any narrative failure the deterministic
/// rationale is kept.
pub struct NarrativeRanking {
    narrative: Arc<dyn NarrativeGenerator>,
    timeout: Duration,
}

impl NarrativeRanking {
    pub fn new(narrative: Arc<dyn NarrativeGenerator>, timeout: Duration) -> Self {
        Self { narrative, timeout }
    }
}

#[async_trait]
impl RankingStrategy for NarrativeRanking {
    async fn rank(&self, candidates: &[CandidateAnalysis]) -> Result<ComparisonResult, AnalysisError> {
        let mut result = compare(candidates)?;
        if !result.is_comparison {
            return Ok(result);
        }

        let prose = with_timeout(
            self.timeout,
            "comparison narrative",
            &result.best_symbol,
            self.narrative.summarize_rationale(candidates, &result),
        )
        .await;

        match prose {
            Ok(text) if !text.trim().is_empty() => result.rationale = text.trim().to_string(),
            Ok(_) => tracing::warn!("Empty comparison narrative; keeping deterministic rationale"),
            Err(e) => tracing::warn!("Comparison narrative unavailable: {}", e),
        }
        Ok(result)
    }
}
