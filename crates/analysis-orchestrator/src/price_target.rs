use analysis_core::{round_to, Action, PriceTarget, Trend};

/// Reference P/E; below 0.8x is undervalued, above 1.5x overvalued.
const REFERENCE_PE: f64 = 20.0;

fn action_multiplier(action: Action) -> f64 {
    match action {
        Action::Buy => 1.20,
        Action::Sell => 0.80,
        Action::Hold => 1.05,
    }
}

fn trend_multiplier(trend: Trend) -> f64 {
    match trend {
        Trend::Bullish => 1.10,
        Trend::Bearish => 0.90,
        Trend::Neutral => 1.00,
    }
}

fn valuation_multiplier(pe: Option<f64>) -> f64 {
    match pe {
        Some(pe) if pe < 0.8 * REFERENCE_PE => 1.15,
        Some(pe) if pe > 1.5 * REFERENCE_PE => 0.85,
        _ => 1.00,
    }
}

/// Heuristic price target: price x action x trend x valuation, rounded to 2 decimals.
pub fn project_price_target(
    action: Action,
    price: Option<f64>,
    trend: Trend,
    pe: Option<f64>,
) -> PriceTarget {
    match price.filter(|p| p.is_finite()) {
        Some(price) => PriceTarget::Price(round_to(
            price * action_multiplier(action) * trend_multiplier(trend) * valuation_multiplier(pe),
            2,
        )),
        None => PriceTarget::NotAvailable,
    }
}
