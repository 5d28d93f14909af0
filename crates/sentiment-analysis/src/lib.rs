use analysis_core::{
    AnalysisError, Headline, NewsProvider, SentimentLabel, SentimentProvider, SentimentReport,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

/// Share of net-positive (or net-negative) headlines needed to leave neutral.
const LABEL_THRESHOLD: f64 = 0.2;

/// Headline categories surfaced as event tags on the report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewsEventType {
    Regulatory,
    Product,
    Leadership,
    General,
}

pub fn classify_event(title: &str) -> NewsEventType {
    let text = format!(" {} ", title.to_lowercase());

    if text.contains("fda") || text.contains(" sec ") || text.contains("regulat")
        || text.contains("approval") || text.contains("antitrust") || text.contains("compliance")
        || text.contains("probe") || text.contains("investigation") {
        NewsEventType::Regulatory
    } else if text.contains("launch") || text.contains("product") || text.contains("recall")
        || text.contains("unveil") || text.contains("release") || text.contains("patent") {
        NewsEventType::Product
    } else if text.contains("ceo") || text.contains("cfo") || text.contains("board")
        || text.contains("executive") || text.contains("resign") || text.contains("appoint")
        || text.contains("steps down") {
        NewsEventType::Leadership
    } else {
        NewsEventType::General
    }
}

/// Lexicon-based headline sentiment with short-range negation handling.
pub struct SentimentAnalysisEngine {
    positive_words: HashSet<&'static str>,
    negative_words: HashSet<&'static str>,
    negation_words: HashSet<&'static str>,
}

impl Default for SentimentAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SentimentAnalysisEngine {
    pub fn new() -> Self {
        Self {
            positive_words: [
                "bullish", "rally", "rallies", "surge", "surges", "gain", "gains", "profit",
                "growth", "beat", "beats", "upgrade", "upgraded", "outperform", "strong",
                "positive", "rise", "rises", "increase", "breakthrough", "innovation",
                "success", "exceed", "exceeds", "momentum", "buy", "optimistic", "record",
                "high", "advance", "dividend", "buyback", "repurchase", "upside", "recovery",
                "rebound", "expansion", "robust", "accelerating", "overweight", "raised",
                "tailwind", "soars", "jumps",
            ]
            .into_iter()
            .collect(),
            negative_words: [
                "bearish", "decline", "declines", "loss", "losses", "fall", "falls", "plunge",
                "plunges", "crash", "miss", "misses", "downgrade", "downgraded",
                "underperform", "weak", "negative", "drop", "drops", "decrease", "concern",
                "concerns", "risk", "fail", "fails", "disappoint", "disappoints", "slump",
                "sell", "warning", "pessimistic", "low", "retreat", "fear", "trouble",
                "dilution", "headwind", "lawsuit", "litigation", "recall", "investigation",
                "probe", "default", "bankruptcy", "layoff", "layoffs", "downside",
                "overvalued", "bubble", "underweight", "lowered", "suspended", "tumbles",
            ]
            .into_iter()
            .collect(),
            negation_words: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Net lexicon score of a piece of text; positive words count +1, negative -1,
    /// flipped when a negation appears within the preceding few words.
    pub fn analyze_text(&self, text: &str) -> i32 {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '"'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation_words.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut score = 0;
        for (i, word) in words.iter().enumerate() {
            let polarity = if self.positive_words.contains(*word) {
                1
            } else if self.negative_words.contains(*word) {
                -1
            } else {
                continue;
            };

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            score += if negated { -polarity } else { polarity };
        }
        score
    }

    /// Classify a batch of headlines into a report. No headlines gives the neutral "no news" report.
    pub fn analyze_headlines(&self, symbol: &str, headlines: Vec<Headline>) -> SentimentReport {
        if headlines.is_empty() {
            return SentimentReport::no_headlines();
        }

        let mut positive = 0usize;
        let mut negative = 0usize;
        let mut report = SentimentReport::no_headlines();

        for headline in &headlines {
            match self.analyze_text(&headline.title) {
                s if s > 0 => positive += 1,
                s if s < 0 => negative += 1,
                _ => {}
            }

            let bucket = match classify_event(&headline.title) {
                NewsEventType::Regulatory => &mut report.regulatory_changes,
                NewsEventType::Product => &mut report.product_launches,
                NewsEventType::Leadership => &mut report.leadership_changes,
                NewsEventType::General => continue,
            };
            bucket.push(headline.title.clone());
        }

        let total = headlines.len();
        let net = (positive as f64 - negative as f64) / total as f64;
        report.label = if net >= LABEL_THRESHOLD {
            SentimentLabel::Positive
        } else if net <= -LABEL_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };
        report.summary = format!(
            "{} of {} recent {} headlines read positive and {} negative; overall tone is {}.",
            positive, total, symbol, negative, report.label
        );
        report.headlines = headlines;
        report
    }
}

/// [`SentimentProvider`] that scores headlines from any [`NewsProvider`].
pub struct NewsSentimentProvider {
    news: Arc<dyn NewsProvider>,
    engine: SentimentAnalysisEngine,
    max_headlines: usize,
}

impl NewsSentimentProvider {
    pub fn new(news: Arc<dyn NewsProvider>, max_headlines: usize) -> Self {
        Self {
            news,
            engine: SentimentAnalysisEngine::new(),
            max_headlines,
        }
    }
}

#[async_trait]
impl SentimentProvider for NewsSentimentProvider {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<SentimentReport, AnalysisError> {
        let mut headlines = self.news.fetch_headlines(symbol, self.max_headlines).await?;
        headlines.truncate(self.max_headlines);
        tracing::debug!("Scoring {} headlines for {}", headlines.len(), symbol);
        Ok(self.engine.analyze_headlines(symbol, headlines))
    }
}
