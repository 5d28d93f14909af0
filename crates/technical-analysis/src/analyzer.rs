use analysis_core::{round_to, IndicatorSet, MacdSnapshot, PriceSeries, Trend};

use crate::indicators::*;
use crate::patterns::*;

const SHORT_SMA: usize = 20;
const LONG_SMA: usize = 50;

/// Windows and periods used by the indicator engine
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub sma_windows: Vec<usize>,
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_windows: vec![20, 50, 200],
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
        }
    }
}

/// Turns a closing-price series into an [`IndicatorSet`].
///
/// Pure and synchronous. Indicators the series is too short for are left
/// absent; an empty series yields [`IndicatorSet::unavailable`].
#[derive(Debug, Clone, Default)]
pub struct TechnicalAnalysisEngine {
    config: IndicatorConfig,
}

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IndicatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &IndicatorConfig {
        &self.config
    }

    pub fn analyze(&self, series: &PriceSeries) -> IndicatorSet {
        let closes = series.closes();
        let latest = match series.latest() {
            Some(price) => price,
            None => return IndicatorSet::unavailable(),
        };

        let mut windows = self.config.sma_windows.clone();
        for required in [SHORT_SMA, LONG_SMA] {
            if !windows.contains(&required) {
                windows.push(required);
            }
        }

        let sma_values = windows
            .iter()
            .filter_map(|&w| sma(closes, w).map(|v| (w, v)))
            .collect();

        let latest_close = round_to(latest, 2);
        let mut set = IndicatorSet {
            latest_close: Some(latest_close),
            sma: sma_values,
            rsi: rsi(closes, self.config.rsi_period),
            macd: macd(closes, self.config.macd_fast, self.config.macd_slow),
            trend: Some(Trend::Neutral),
            signals: Vec::new(),
            support: None,
            resistance: None,
        };

        let short = set.sma(SHORT_SMA);
        let long = set.sma(LONG_SMA);

        let mut trend = classify_sma_trend(latest_close, short, long, &mut set.signals);
        if let Some(rsi_value) = set.rsi {
            trend = apply_rsi_override(trend, rsi_value, &mut set.signals);
        }
        if let Some(snapshot) = set.macd {
            if let Some(signal) = macd_crossover_signal(&snapshot) {
                set.signals.push(signal.to_string());
            }
        }
        if let Some(pattern) = detect_close_pattern(closes) {
            set.signals.push(pattern.signal().to_string());
        }

        set.trend = Some(trend);
        set.support = long;
        set.resistance = short;

        // Windows added for classification are not reported unless requested.
        set.sma.retain(|w, _| self.config.sma_windows.contains(w));
        set
    }
}

/// Price > SMA20 > SMA50 is bullish, the mirror image bearish, anything else neutral.
fn classify_sma_trend(
    price: f64,
    short: Option<f64>,
    long: Option<f64>,
    signals: &mut Vec<String>,
) -> Trend {
    let (short, long) = match (short, long) {
        (Some(s), Some(l)) => (s, l),
        _ => return Trend::Neutral,
    };

    if price > short && short > long {
        signals.push("Price above 20-day SMA".to_string());
        signals.push("20-day SMA above 50-day SMA".to_string());
        Trend::Bullish
    } else if price < short && short < long {
        signals.push("Price below 20-day SMA".to_string());
        signals.push("20-day SMA below 50-day SMA".to_string());
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// Overbought demotes bullish to neutral, oversold demotes bearish to neutral.
fn apply_rsi_override(trend: Trend, rsi_value: f64, signals: &mut Vec<String>) -> Trend {
    if rsi_value > 70.0 {
        signals.push("RSI overbought (>70)".to_string());
        if trend == Trend::Bullish {
            return Trend::Neutral;
        }
    } else if rsi_value < 30.0 {
        signals.push("RSI oversold (<30)".to_string());
        if trend == Trend::Bearish {
            return Trend::Neutral;
        }
    }
    trend
}

fn macd_crossover_signal(snapshot: &MacdSnapshot) -> Option<&'static str> {
    if snapshot.histogram > 0.0 && snapshot.line > snapshot.signal {
        Some("MACD bullish crossover")
    } else if snapshot.histogram < 0.0 && snapshot.line < snapshot.signal {
        Some("MACD bearish crossover")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising(len: usize) -> PriceSeries {
        PriceSeries::new((0..len).map(|i| 100.0 + i as f64).collect())
    }

    #[test]
    fn test_empty_series_is_unavailable() {
        let engine = TechnicalAnalysisEngine::new();
        let set = engine.analyze(&PriceSeries::default());
        assert!(!set.is_available());
        assert_eq!(set, IndicatorSet::unavailable());
    }

    #[test]
    fn test_long_uptrend_with_pullback_is_bullish() {
        // 60 rising closes then a shallow dip keeps price > SMA20 > SMA50
        // while the last deltas pull RSI below 70.
        let mut closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        for _ in 0..4 {
            let last = closes[closes.len() - 1];
            closes.push(last - 1.5);
            closes.push(last - 0.5);
        }
        let engine = TechnicalAnalysisEngine::new();
        let set = engine.analyze(&PriceSeries::new(closes));

        assert_eq!(set.trend, Some(Trend::Bullish));
        assert!(set.signals.contains(&"Price above 20-day SMA".to_string()));
        assert!(set.signals.contains(&"20-day SMA above 50-day SMA".to_string()));
        assert!(set.rsi.map(|r| r <= 70.0).unwrap_or(false));
        assert_eq!(set.support, set.sma(50));
        assert_eq!(set.resistance, set.sma(20));
    }

    #[test]
    fn test_overbought_demotes_bullish_trend() {
        let engine = TechnicalAnalysisEngine::new();
        let set = engine.analyze(&rising(60));

        assert_eq!(set.rsi, Some(100.0));
        assert_eq!(set.trend, Some(Trend::Neutral));
        assert!(set.signals.contains(&"Price above 20-day SMA".to_string()));
        assert!(set.signals.contains(&"RSI overbought (>70)".to_string()));
        assert!(set.signals.contains(&"MACD bullish crossover".to_string()));
        assert_eq!(set.signals.last().map(String::as_str), Some("Three white soldiers pattern"));
    }

    #[test]
    fn test_oversold_demotes_bearish_trend() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let engine = TechnicalAnalysisEngine::new();
        let set = engine.analyze(&PriceSeries::new(closes));

        assert_eq!(set.rsi, Some(0.0));
        assert_eq!(set.trend, Some(Trend::Neutral));
        assert!(set.signals.contains(&"20-day SMA below 50-day SMA".to_string()));
        assert!(set.signals.contains(&"RSI oversold (<30)".to_string()));
        assert!(set.signals.contains(&"MACD bearish crossover".to_string()));
        assert!(set.signals.contains(&"Three black crows pattern".to_string()));
    }

    #[test]
    fn test_unrequested_windows_are_not_reported() {
        let engine = TechnicalAnalysisEngine::with_config(IndicatorConfig {
            sma_windows: vec![5],
            ..Default::default()
        });
        let set = engine.analyze(&rising(60));
        assert_eq!(set.sma.keys().copied().collect::<Vec<_>>(), vec![5]);
        assert_eq!(set.resistance, Some(149.5));
    }

    #[test]
    fn test_sma200_reported_when_series_is_long_enough() {
        let engine = TechnicalAnalysisEngine::new();
        let set = engine.analyze(&rising(200));
        assert_eq!(set.sma(200), Some(199.5));
        assert!(engine.analyze(&rising(199)).sma(200).is_none());
    }
}
