use analysis_core::{round_to, Fundamentals, PriceSeries, RiskProfile};
use statrs::statistics::Statistics;

const TRADING_DAYS: f64 = 252.0;

/// Volatility and downside statistics from daily closes.
///
/// Pure and synchronous; undefined statistics are `None`, never zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuantAnalysisEngine;

impl QuantAnalysisEngine {
    pub fn new() -> Self {
        Self
    }

    /// Daily simple returns. Pairs with a zero previous close are skipped.
    pub fn calculate_returns(&self, prices: &[f64]) -> Vec<f64> {
        prices
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }

    /// Annualized volatility in percent, rounded to 2 decimals
    pub fn calculate_volatility(&self, returns: &[f64]) -> Option<f64> {
        annualized_deviation(returns)
    }

    /// Annualized semi-deviation of the negative returns around their own mean
    pub fn calculate_downside_risk(&self, returns: &[f64]) -> Option<f64> {
        let negative: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
        annualized_deviation(&negative)
    }

    /// Heuristic gain/loss bands. Both are clamped to [0, 100] and sum to 100.
    pub fn probability_bands(&self, volatility: f64) -> (f64, f64) {
        let gain = round_to((50.0 - volatility / 2.0).clamp(0.0, 50.0), 2);
        let loss = round_to(100.0 - gain, 2);
        (gain, loss)
    }

    /// Build a risk profile from the price series and the symbol's fundamentals.
    ///
    /// Beta is passed through from `fundamentals`; price and P/E only feed the
    /// scenario text.
    pub fn assess(&self, series: &PriceSeries, fundamentals: &Fundamentals) -> RiskProfile {
        let returns = self.calculate_returns(series.closes());
        let volatility = self.calculate_volatility(&returns);
        let downside_risk = self.calculate_downside_risk(&returns);
        let (probability_gain, probability_loss) = match volatility {
            Some(v) => {
                let (gain, loss) = self.probability_bands(v);
                (Some(gain), Some(loss))
            }
            None => (None, None),
        };

        let mut profile = RiskProfile {
            volatility,
            downside_risk,
            beta: fundamentals.beta,
            probability_gain,
            probability_loss,
            scenario_analysis: String::new(),
        };
        profile.scenario_analysis = scenario_text(&profile, fundamentals);
        profile
    }
}

fn annualized_deviation(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let std_dev = values.iter().population_std_dev();
    if !std_dev.is_finite() {
        return None;
    }
    Some(round_to(std_dev * TRADING_DAYS.sqrt() * 100.0, 2))
}

fn volatility_band(volatility: f64) -> &'static str {
    if volatility < 20.0 {
        "low"
    } else if volatility < 40.0 {
        "moderate"
    } else {
        "high"
    }
}

/// Deterministic one-paragraph scenario summary.
pub fn scenario_text(profile: &RiskProfile, fundamentals: &Fundamentals) -> String {
    let volatility = match profile.volatility {
        Some(v) => v,
        None => {
            return format!(
                "Not enough price history to estimate volatility for {}.",
                fundamentals.symbol
            )
        }
    };

    let mut parts = vec![format!(
        "{} shows {} volatility ({:.2}% annualized).",
        fundamentals.symbol,
        volatility_band(volatility),
        volatility
    )];

    if let Some(price) = fundamentals.price.filter(|p| *p > 0.0) {
        let swing = volatility / 100.0;
        parts.push(format!(
            "A one-standard-deviation year ranges from about ${:.2} to ${:.2}.",
            round_to((price * (1.0 - swing)).max(0.0), 2),
            round_to(price * (1.0 + swing), 2)
        ));
    }

    if let Some(beta) = profile.beta {
        let relative = if beta > 1.2 {
            "more sharply than"
        } else if beta < 0.8 {
            "less sharply than"
        } else {
            "roughly in line with"
        };
        parts.push(format!("Beta of {:.2} means it tends to move {} the market.", beta, relative));
    }

    if let Some(pe) = fundamentals.pe_ratio {
        if pe > 30.0 {
            parts.push(format!("A P/E of {:.1} leaves room for a valuation pullback.", pe));
        } else if pe > 0.0 && pe < 16.0 {
            parts.push(format!("A P/E of {:.1} offers some valuation support.", pe));
        }
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn fundamentals(symbol: &str) -> Fundamentals {
        Fundamentals::unknown(symbol)
    }

    #[test]
    fn test_calculate_returns() {
        let engine = QuantAnalysisEngine::new();
        let returns = engine.calculate_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.1, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.1, epsilon = 1e-12);
        assert!(engine.calculate_returns(&[0.0, 5.0, 6.0]).iter().all(|r| r.is_finite()));
    }

    #[test]
    fn test_volatility_uses_population_deviation() {
        let engine = QuantAnalysisEngine::new();
        // returns +0.1 and -0.1: population std 0.1
        let vol = engine.calculate_volatility(&[0.1, -0.1]).unwrap();
        assert_relative_eq!(vol, round_to(0.1 * 252f64.sqrt() * 100.0, 2), epsilon = 1e-9);
        assert_relative_eq!(vol, 158.75, epsilon = 1e-9);
    }

    #[test]
    fn test_volatility_requires_two_closes() {
        let engine = QuantAnalysisEngine::new();
        let profile = engine.assess(&PriceSeries::new(vec![100.0]), &fundamentals("X"));
        assert!(profile.volatility.is_none());
        assert!(profile.downside_risk.is_none());
        assert!(profile.probability_gain.is_none());
        assert!(profile.probability_loss.is_none());
    }

    #[test]
    fn test_downside_risk_none_without_negative_returns() {
        let engine = QuantAnalysisEngine::new();
        let series = PriceSeries::new(vec![100.0, 101.0, 103.0, 104.0]);
        let profile = engine.assess(&series, &fundamentals("UP"));
        assert!(profile.volatility.map(|v| v >= 0.0).unwrap_or(false));
        assert!(profile.downside_risk.is_none());
    }

    #[test]
    fn test_downside_risk_around_negative_mean() {
        let engine = QuantAnalysisEngine::new();
        // negative returns -0.1 and -0.3: mean -0.2, population std 0.1
        let downside = engine.calculate_downside_risk(&[0.2, -0.1, 0.05, -0.3]).unwrap();
        assert_relative_eq!(downside, 158.75, epsilon = 1e-9);
        // a single negative return has zero dispersion
        assert_eq!(engine.calculate_downside_risk(&[0.2, -0.1]), Some(0.0));
    }

    #[test]
    fn test_probability_bands_sum_to_100() {
        let engine = QuantAnalysisEngine::new();
        for vol in [0.0, 12.34, 29.99, 55.55, 99.99, 100.0, 180.0] {
            let (gain, loss) = engine.probability_bands(vol);
            assert!((0.0..=100.0).contains(&gain));
            assert!((0.0..=100.0).contains(&loss));
            assert_relative_eq!(gain + loss, 100.0, epsilon = 1e-9);
        }
        assert_eq!(engine.probability_bands(20.0), (40.0, 60.0));
        assert_eq!(engine.probability_bands(180.0), (0.0, 100.0));
    }

    #[test]
    fn test_assess_passes_beta_through() {
        let engine = QuantAnalysisEngine::new();
        let mut f = fundamentals("BETA");
        f.beta = Some(1.35);
        f.price = Some(50.0);
        f.pe_ratio = Some(45.0);
        let series = PriceSeries::new(vec![50.0, 49.0, 51.0, 50.5, 52.0, 50.0]);
        let profile = engine.assess(&series, &f);

        assert_eq!(profile.beta, Some(1.35));
        assert!(profile.volatility.unwrap() > 0.0);
        assert!(profile.scenario_analysis.starts_with("BETA shows"));
        assert!(profile.scenario_analysis.contains("Beta of 1.35"));
        assert!(profile.scenario_analysis.contains("P/E of 45.0"));
    }
}
