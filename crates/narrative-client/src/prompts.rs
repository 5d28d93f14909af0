use analysis_core::{CandidateAnalysis, ComparisonResult, Fundamentals};
use std::fmt::Write;

fn or_na<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

fn candidate_block(index: usize, c: &CandidateAnalysis) -> String {
    let f = &c.fundamentals;
    let signals = if c.indicators.signals.is_empty() {
        "None".to_string()
    } else {
        c.indicators.signals.join(", ")
    };

    format!(
        "STOCK {}: {}\n\
         - Price: ${}\n\
         - P/E Ratio: {}\n\
         - Market Cap: {}\n\
         - EPS: {}\n\
         - Beta: {}\n\
         - Debt Ratio: {}\n\
         - Price Change: {}%\n\
         - News Sentiment: {}\n\
         - Technical Trend: {}\n\
         - Volatility: {}%\n\
         - RSI: {}\n\
         - Key Signals: {}\n",
        index + 1,
        c.symbol,
        or_na(f.price),
        or_na(f.pe_ratio),
        or_na(f.market_cap_display()),
        or_na(f.eps),
        or_na(f.beta),
        or_na(f.debt_ratio),
        or_na(f.price_change_percent),
        c.sentiment_label(),
        c.trend(),
        or_na(c.risk.volatility),
        or_na(c.indicators.rsi),
        signals,
    )
}

/// Ask for prose explaining an already-made selection.
pub fn rationale_prompt(candidates: &[CandidateAnalysis], selection: &ComparisonResult) -> String {
    let mut prompt = format!(
        "{} was selected as the best investment among {} stocks by a deterministic scoring model.\n\n",
        selection.best_symbol,
        candidates.len()
    );
    for (i, c) in candidates.iter().enumerate() {
        prompt.push_str(&candidate_block(i, c));
        prompt.push('\n');
    }
    if !selection.scores.is_empty() {
        prompt.push_str("SCORES:\n");
        for s in &selection.scores {
            let _ = writeln!(prompt, "- {}: {}", s.symbol, s.score);
        }
        prompt.push('\n');
    }
    prompt.push_str(
        "Write a 3-4 sentence explanation of why this stock stands out against the others, \
         citing the specific metrics above. Do not change the selection. Reply with plain text only.",
    );
    prompt
}

pub fn risk_prompt(symbol: &str, f: &Fundamentals) -> String {
    format!(
        "Analyze risk scenarios for {} (Price: ${}, Beta: {}, P/E: {}):\n\
         1. If interest rates rise by 2%\n\
         2. If market volatility increases by 50%\n\
         3. If sector-specific risks materialize\n\
         4. Probability of short-term gains/losses\n\n\
         Provide brief scenario analysis in 2-3 sentences.",
        symbol,
        or_na(f.price),
        or_na(f.beta),
        or_na(f.pe_ratio),
    )
}

pub const RECOMMENDATION_SYSTEM: &str = "You are a senior financial advisor providing investment recommendations. \
Always structure your response as a JSON object with these exact fields: \
{\"action\": \"Buy/Hold/Sell\", \"rationale\": \"2-3 sentences\", \"confidence\": \"High/Medium/Low\", \
\"keyRisks\": [\"risk 1\", \"risk 2\", \"risk 3\"], \"keyOpportunities\": [\"opportunity 1\", \"opportunity 2\", \"opportunity 3\"], \
\"timeHorizon\": \"Short-term/Medium-term/Long-term\"}. \
Provide specific, actionable risks and opportunities based on the data provided.";

pub fn recommendation_prompt(selected: &CandidateAnalysis, comparison: &ComparisonResult) -> String {
    let f = &selected.fundamentals;
    let mut prompt = if comparison.is_comparison {
        format!(
            "Provide investment recommendation for {} - the BEST choice among {} compared stocks.\n\n\
             COMPARISON CONTEXT: {}\n\n",
            selected.symbol,
            comparison.alternatives.len() + 1,
            comparison.rationale
        )
    } else {
        format!("Provide investment recommendation for {}:\n\n", selected.symbol)
    };

    let _ = write!(
        prompt,
        "SELECTED STOCK DETAILS:\n\
         - Symbol: {}\n\
         - Company: {}\n\
         - Price: {}\n\
         - P/E Ratio: {}\n\
         - Market Cap: {}\n\
         - EPS: {}\n\
         - Beta: {}\n\
         - Debt Ratio: {}\n\
         - News Sentiment: {} - {}\n\
         - Technical Trend: {}\n\
         - Volatility: {}%\n\
         - Risk Scenario: {}\n",
        selected.symbol,
        f.display_name(),
        or_na(f.price),
        or_na(f.pe_ratio),
        or_na(f.market_cap_display()),
        or_na(f.eps),
        or_na(f.beta),
        or_na(f.debt_ratio),
        selected.sentiment_label(),
        selected.sentiment_summary(),
        selected.trend(),
        or_na(selected.risk.volatility),
        selected.risk.scenario_analysis,
    );

    if comparison.is_comparison {
        prompt.push_str(
            "\nINSTRUCTION: Emphasize WHY this stock was chosen as the best among the compared options.",
        );
    }
    prompt
}
