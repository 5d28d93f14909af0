//! Pure decoding of Yahoo Finance payloads.
//!
//! Yahoo mixes plain numbers with `{ "raw": n, "fmt": "..." }` objects, and any
//! field may be absent; every accessor here returns `None` rather than zero.

use analysis_core::{round_to, Fundamentals, Headline, PriceSeries};
use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;

use crate::error::YahooError;

/// Numeric value of a plain number, a numeric string, or a `{raw}`/`{fmt}` object.
pub fn to_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        Value::Object(map) => map
            .get("raw")
            .and_then(to_number)
            .or_else(|| map.get("fmt").and_then(to_number)),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn number(obj: Option<&Value>, key: &str) -> Option<f64> {
    obj.and_then(|o| o.get(key)).and_then(to_number)
}

fn text(obj: Option<&Value>, key: &str) -> Option<String> {
    obj.and_then(|o| o.get(key))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn range(low: Option<f64>, high: Option<f64>) -> Option<String> {
    match (low, high) {
        (Some(low), Some(high)) => Some(format!("{} - {}", low, high)),
        _ => None,
    }
}

/// First element of `quoteResponse.result`.
pub fn quote_result<'a>(body: &'a Value, symbol: &str) -> Result<&'a Value, YahooError> {
    body.pointer("/quoteResponse/result/0")
        .filter(|v| v.is_object())
        .ok_or_else(|| YahooError::NotFound(symbol.to_string()))
}

/// First element of `quoteSummary.result`, if the summary call returned one.
pub fn summary_result(body: &Value) -> Option<&Value> {
    body.pointer("/quoteSummary/result/0").filter(|v| v.is_object())
}

/// Total liabilities over total assets from the latest balance sheet, 3 decimals.
pub fn debt_ratio(summary: &Value) -> Option<f64> {
    let sheet = summary.pointer("/balanceSheetHistory/balanceSheetStatements/0")?;
    let liabilities = number(Some(sheet), "totalLiabilities").or_else(|| number(Some(sheet), "totalLiab"))?;
    let assets = number(Some(sheet), "totalAssets")?;
    if assets == 0.0 {
        return None;
    }
    Some(round_to(liabilities / assets, 3))
}

/// Merge the quote and the optional quote summary into a [`Fundamentals`] snapshot.
pub fn parse_fundamentals(symbol: &str, quote: &Value, summary: Option<&Value>) -> Fundamentals {
    let quote = Some(quote);
    let price_mod = summary.and_then(|s| s.get("price"));
    let detail = summary.and_then(|s| s.get("summaryDetail"));
    let stats = summary.and_then(|s| s.get("defaultKeyStatistics"));
    let financial = summary.and_then(|s| s.get("financialData"));

    let price = number(quote, "regularMarketPrice").or_else(|| number(price_mod, "regularMarketPrice"));
    let price_change_percent = number(quote, "regularMarketChangePercent")
        .or_else(|| number(price_mod, "regularMarketChangePercent"))
        .map(|pct| round_to(pct, 2));
    let price_change = number(quote, "regularMarketChange")
        .or_else(|| number(price_mod, "regularMarketChange"))
        .or_else(|| match (price, price_change_percent) {
            (Some(p), Some(pct)) => Some(round_to(p * pct / 100.0, 2)),
            _ => None,
        });

    let day_low = number(detail, "dayLow").or_else(|| number(quote, "regularMarketDayLow"));
    let day_high = number(detail, "dayHigh").or_else(|| number(quote, "regularMarketDayHigh"));
    let year_low = number(detail, "fiftyTwoWeekLow").or_else(|| number(quote, "fiftyTwoWeekLow"));
    let year_high = number(detail, "fiftyTwoWeekHigh").or_else(|| number(quote, "fiftyTwoWeekHigh"));

    Fundamentals {
        symbol: symbol.to_string(),
        company_name: text(quote, "longName")
            .or_else(|| text(price_mod, "longName"))
            .or_else(|| text(quote, "shortName")),
        exchange: text(quote, "fullExchangeName")
            .or_else(|| text(quote, "exchangeName"))
            .or_else(|| text(price_mod, "exchangeName")),
        price,
        price_change,
        price_change_percent,
        market_cap: number(quote, "marketCap")
            .or_else(|| number(price_mod, "marketCap"))
            .or_else(|| number(stats, "marketCap")),
        pe_ratio: number(quote, "trailingPE")
            .or_else(|| number(stats, "trailingPE"))
            .or_else(|| number(detail, "trailingPE")),
        eps: number(financial, "trailingEps")
            .or_else(|| number(stats, "trailingEps"))
            .or_else(|| number(quote, "epsTrailingTwelveMonths")),
        debt_ratio: summary.and_then(debt_ratio),
        dividend_yield: number(detail, "dividendYield").or_else(|| number(financial, "dividendYield")),
        beta: number(stats, "beta").or_else(|| number(detail, "beta")),
        volume: number(quote, "regularMarketVolume")
            .or_else(|| number(price_mod, "volume"))
            .or_else(|| number(detail, "volume"))
            .map(|v| v.max(0.0).round() as u64),
        avg_volume: number(detail, "averageVolume")
            .or_else(|| number(price_mod, "averageDailyVolume10Day"))
            .or_else(|| number(stats, "averageVolume"))
            .map(|v| v.max(0.0).round() as u64),
        day_range: range(day_low, day_high),
        year_range: range(year_low, year_high),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Daily closes from a chart payload, skipping the null gaps Yahoo leaves on halted days.
pub fn parse_chart(symbol: &str, response: ChartResponse) -> Result<PriceSeries, YahooError> {
    let closes: Vec<f64> = response
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .and_then(|result| result.indicators.quote.into_iter().next())
        .map(|quote| quote.close.into_iter().flatten().collect())
        .unwrap_or_default();

    let series = PriceSeries::new(closes);
    if series.is_empty() {
        return Err(YahooError::NotFound(symbol.to_string()));
    }
    Ok(series)
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    news: Vec<NewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsItem {
    #[serde(default)]
    title: String,
    publisher: Option<String>,
    link: Option<String>,
    provider_publish_time: Option<i64>,
}

pub fn parse_news(response: SearchResponse, max_items: usize) -> Vec<Headline> {
    response
        .news
        .into_iter()
        .filter(|item| !item.title.trim().is_empty())
        .take(max_items)
        .map(|item| Headline {
            title: item.title,
            publisher: item.publisher,
            link: item.link,
            published: item
                .provider_publish_time
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
        .collect()
}
