use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Pipeline limits, lookbacks and timeouts
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub max_symbols: usize,               // 5
    pub max_extracted_symbols: usize,     // 8
    pub technical_lookback_days: u32,     // 200
    pub risk_lookback_days: u32,          // 252
    pub max_headlines: usize,             // 8
    pub call_timeout: Duration,           // per external call
    pub candidate_timeout: Duration,      // per candidate unit
    pub concurrency: usize,               // fan-out width
    pub yahoo_rate_limit: usize,          // requests per minute
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            max_symbols: 5,
            max_extracted_symbols: 8,
            technical_lookback_days: 200,
            risk_lookback_days: 252,
            max_headlines: 8,
            call_timeout: Duration::from_secs(15),
            candidate_timeout: Duration::from_secs(45),
            concurrency: 5,
            yahoo_rate_limit: 120,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        _ => Ok(default),
    }
}

impl AdvisorConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            max_symbols: env_or("ADVISOR_MAX_SYMBOLS", defaults.max_symbols)?,
            max_extracted_symbols: env_or("ADVISOR_MAX_EXTRACTED_SYMBOLS", defaults.max_extracted_symbols)?,
            technical_lookback_days: env_or("ADVISOR_TECHNICAL_LOOKBACK_DAYS", defaults.technical_lookback_days)?,
            risk_lookback_days: env_or("ADVISOR_RISK_LOOKBACK_DAYS", defaults.risk_lookback_days)?,
            max_headlines: env_or("ADVISOR_MAX_HEADLINES", defaults.max_headlines)?,
            call_timeout: Duration::from_secs(env_or(
                "ADVISOR_CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )?),
            candidate_timeout: Duration::from_secs(env_or(
                "ADVISOR_CANDIDATE_TIMEOUT_SECS",
                defaults.candidate_timeout.as_secs(),
            )?),
            concurrency: env_or("ADVISOR_CONCURRENCY", defaults.concurrency)?,
            yahoo_rate_limit: env_or("YAHOO_RATE_LIMIT", defaults.yahoo_rate_limit)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_symbols == 0 {
            anyhow::bail!("ADVISOR_MAX_SYMBOLS must be at least 1");
        }
        if self.max_extracted_symbols < self.max_symbols {
            anyhow::bail!(
                "ADVISOR_MAX_EXTRACTED_SYMBOLS ({}) must not be below ADVISOR_MAX_SYMBOLS ({})",
                self.max_extracted_symbols,
                self.max_symbols
            );
        }
        if self.concurrency == 0 {
            anyhow::bail!("ADVISOR_CONCURRENCY must be at least 1");
        }
        if self.call_timeout.is_zero() || self.candidate_timeout.is_zero() {
            anyhow::bail!("Timeouts must be greater than zero");
        }
        Ok(())
    }
}

/// Company-name to ticker table used by the fallback symbol extractor.
///
/// Keys are upper-case names; multi-word names may be written with `_` or a space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolAliases {
    names: HashMap<String, String>,
}

impl Default for SymbolAliases {
    fn default() -> Self {
        Self::from_pairs([
            ("TESLA", "TSLA"),
            ("APPLE", "AAPL"),
            ("MICROSOFT", "MSFT"),
            ("GOOGLE", "GOOGL"),
            ("ALPHABET", "GOOGL"),
            ("AMAZON", "AMZN"),
            ("NVIDIA", "NVDA"),
            ("META", "META"),
            ("FACEBOOK", "META"),
            ("FORD", "F"),
            ("GENERAL_MOTORS", "GM"),
            ("TOYOTA", "TM"),
        ])
    }
}

impl SymbolAliases {
    pub fn empty() -> Self {
        Self { names: HashMap::new() }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut aliases = Self::empty();
        for (name, ticker) in pairs {
            aliases.insert(name.as_ref(), ticker.as_ref());
        }
        aliases
    }

    pub fn insert(&mut self, name: &str, ticker: &str) {
        self.names
            .insert(normalize_name(name), ticker.trim().to_uppercase());
    }

    /// Ticker for a company name, matched case-insensitively.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.names.get(&normalize_name(name)).map(String::as_str)
    }

    /// Longest alias measured in words, used to bound phrase matching.
    pub fn max_words(&self) -> usize {
        self.names
            .keys()
            .map(|k| k.split('_').count())
            .max()
            .unwrap_or(0)
    }
}

fn normalize_name(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdvisorConfig::default();
        assert_eq!(config.max_symbols, 5);
        assert_eq!(config.max_extracted_symbols, 8);
        assert_eq!(config.technical_lookback_days, 200);
        assert_eq!(config.risk_lookback_days, 252);
        assert_eq!(config.max_headlines, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_caps() {
        let config = AdvisorConfig {
            max_symbols: 6,
            max_extracted_symbols: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_or_reports_bad_value() {
        std::env::set_var("ADVISOR_TEST_BAD_NUMBER", "five");
        let err = env_or::<usize>("ADVISOR_TEST_BAD_NUMBER", 5).unwrap_err();
        assert!(err.to_string().contains("ADVISOR_TEST_BAD_NUMBER"));
        std::env::remove_var("ADVISOR_TEST_BAD_NUMBER");

        assert_eq!(env_or::<usize>("ADVISOR_TEST_UNSET_NUMBER", 7).unwrap(), 7);
    }

    #[test]
    fn test_alias_resolution() {
        let aliases = SymbolAliases::default();
        assert_eq!(aliases.resolve("tesla"), Some("TSLA"));
        assert_eq!(aliases.resolve("General Motors"), Some("GM"));
        assert_eq!(aliases.resolve("GENERAL_MOTORS"), Some("GM"));
        assert_eq!(aliases.resolve("Rivian"), None);
        assert_eq!(aliases.max_words(), 2);
    }

    #[test]
    fn test_custom_aliases_are_injectable() {
        let mut aliases = SymbolAliases::empty();
        aliases.insert("Berkshire Hathaway", "brk");
        assert_eq!(aliases.resolve("BERKSHIRE HATHAWAY"), Some("BRK"));
        assert_eq!(aliases.resolve("Tesla"), None);
    }
}
