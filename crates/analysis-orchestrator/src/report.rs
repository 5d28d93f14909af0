use analysis_core::{CandidateAnalysis, ComparisonResult, Recommendation};
use serde::{Deserialize, Serialize};

/// Everything one pipeline run produces, in request order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorReport {
    pub symbols: Vec<String>,
    pub candidates: Vec<CandidateAnalysis>,
    pub comparison: ComparisonResult,
    pub recommendation: Recommendation,
    pub total_analyzed: usize,
}

impl AdvisorReport {
    pub fn selected(&self) -> Option<&CandidateAnalysis> {
        self.candidates
            .iter()
            .find(|c| c.symbol == self.comparison.best_symbol)
    }
}
