use analysis_core::AnalysisError;

use crate::config::SymbolAliases;

const NO_SYMBOLS: &str =
    "Could not detect any valid stock symbols in your request. Please include tickers like AAPL or TSLA.";

/// `^[A-Z]{1,5}$`
pub fn is_valid_symbol(symbol: &str) -> bool {
    (1..=5).contains(&symbol.len()) && symbol.bytes().all(|b| b.is_ascii_uppercase())
}

fn push_unique(symbols: &mut Vec<String>, symbol: String) {
    if !symbols.contains(&symbol) {
        symbols.push(symbol);
    }
}

/// Normalize, check and deduplicate request symbols, keeping the first `max` in request order.
///
/// Any entry that does not match `^[A-Z]{1,5}$` after trimming and upper-casing rejects the
/// whole request, as does an empty list.
pub fn validate_symbols<S: AsRef<str>>(raw: &[S], max: usize) -> Result<Vec<String>, AnalysisError> {
    let mut symbols = Vec::with_capacity(raw.len());
    for entry in raw {
        let symbol = entry.as_ref().trim().to_uppercase();
        if !is_valid_symbol(&symbol) {
            return Err(AnalysisError::Validation(format!(
                "'{}' is not a valid ticker (expected 1-5 letters)",
                entry.as_ref().trim()
            )));
        }
        push_unique(&mut symbols, symbol);
    }

    if symbols.is_empty() {
        return Err(AnalysisError::Validation(NO_SYMBOLS.to_string()));
    }

    if symbols.len() > max {
        tracing::warn!(
            "Request named {} symbols; analyzing the first {}",
            symbols.len(),
            max
        );
        symbols.truncate(max);
    }
    Ok(symbols)
}

struct Token {
    word: String,
    cashtag: bool,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut cashtag = false;
    let mut prev = ' ';

    for c in text.chars() {
        if c.is_ascii_alphabetic() {
            if current.is_empty() {
                cashtag = prev == '$';
            }
            current.push(c.to_ascii_uppercase());
        } else if !current.is_empty() {
            tokens.push(Token { word: std::mem::take(&mut current), cashtag });
        }
        prev = c;
    }
    if !current.is_empty() {
        tokens.push(Token { word: current, cashtag });
    }
    tokens
}

/// Deterministic ticker extraction from free text.
///
/// `$TICKER` cash-tags are taken verbatim; other words are matched against `aliases`,
/// longest phrase first. Results keep their order of appearance, are deduplicated and
/// capped at `cap`.
pub fn extract_symbols(text: &str, aliases: &SymbolAliases, cap: usize) -> Result<Vec<String>, AnalysisError> {
    let tokens = tokenize(text);
    let max_words = aliases.max_words().max(1);
    let mut symbols = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].cashtag {
            if is_valid_symbol(&tokens[i].word) {
                push_unique(&mut symbols, tokens[i].word.clone());
            }
            i += 1;
            continue;
        }

        let longest = (1..=max_words)
            .rev()
            .filter(|n| i + n <= tokens.len())
            .find_map(|n| {
                let phrase = &tokens[i..i + n];
                if phrase.iter().any(|t| t.cashtag) {
                    return None;
                }
                let name = phrase.iter().map(|t| t.word.as_str()).collect::<Vec<_>>().join("_");
                aliases.resolve(&name).map(|ticker| (n, ticker.to_string()))
            });

        match longest {
            Some((n, ticker)) => {
                push_unique(&mut symbols, ticker);
                i += n;
            }
            None => i += 1,
        }
    }

    if symbols.is_empty() {
        return Err(AnalysisError::Validation(NO_SYMBOLS.to_string()));
    }
    symbols.truncate(cap);
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_symbol() {
        assert!(is_valid_symbol("F"));
        assert!(is_valid_symbol("GOOGL"));
        assert!(!is_valid_symbol(""));
        assert!(!is_valid_symbol("GOOGLE"));
        assert!(!is_valid_symbol("aapl"));
        assert!(!is_valid_symbol("BRK.B"));
        assert!(!is_valid_symbol("AB1"));
    }

    #[test]
    fn test_validate_normalizes_and_dedupes() {
        let symbols = validate_symbols(&[" aapl", "MSFT", "AAPL", "nvda"], 5).unwrap();
        assert_eq!(symbols, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_validate_caps_in_request_order() {
        let raw = ["A", "B", "C", "D", "E", "F", "G"];
        assert_eq!(validate_symbols(&raw, 5).unwrap(), vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_validate_rejects_bad_symbol() {
        let err = validate_symbols(&["AAPL", "TOOLONG"], 5).unwrap_err();
        assert!(matches!(err, AnalysisError::Validation(_)));
        assert!(err.to_string().contains("TOOLONG"));
    }

    #[test]
    fn test_validate_rejects_empty_request() {
        let empty: [&str; 0] = [];
        assert!(matches!(validate_symbols(&empty, 5), Err(AnalysisError::Validation(_))));
    }

    #[test]
    fn test_extract_company_names_in_order() {
        let aliases = SymbolAliases::default();
        let symbols = extract_symbols("Should I buy Tesla or Apple? Maybe tesla again.", &aliases, 8).unwrap();
        assert_eq!(symbols, vec!["TSLA", "AAPL"]);
    }

    #[test]
    fn test_extract_cashtags_and_phrases() {
        let aliases = SymbolAliases::default();
        let symbols =
            extract_symbols("Compare $amd with General Motors and $TOOLONG, also Ford", &aliases, 8).unwrap();
        assert_eq!(symbols, vec!["AMD", "GM", "F"]);
    }

    #[test]
    fn test_extract_respects_cap() {
        let aliases = SymbolAliases::default();
        let text = "tesla apple microsoft google amazon nvidia meta ford toyota";
        let symbols = extract_symbols(text, &aliases, 8).unwrap();
        assert_eq!(symbols.len(), 8);
        assert_eq!(symbols[0], "TSLA");
        assert_eq!(symbols[7], "F");
    }

    #[test]
    fn test_extract_nothing_is_validation_error() {
        let aliases = SymbolAliases::default();
        let err = extract_symbols("what's the market doing today?", &aliases, 8).unwrap_err();
        assert_eq!(err, AnalysisError::Validation(NO_SYMBOLS.to_string()));
    }
}
