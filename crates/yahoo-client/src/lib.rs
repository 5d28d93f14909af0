use analysis_core::{AnalysisError, Fundamentals, Headline, MarketDataProvider, NewsProvider, PriceSeries};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub mod error;
pub mod parse;

pub use error::YahooError;

const QUERY1_URL: &str = "https://query1.finance.yahoo.com";
const QUERY2_URL: &str = "https://query2.finance.yahoo.com";
/// Sets the session cookie the crumb is bound to. Responds 404, which is expected.
const COOKIE_URL: &str = "https://fc.yahoo.com";

const SUMMARY_MODULES: &str =
    "price,summaryDetail,defaultKeyStatistics,financialData,balanceSheetHistory";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

const MAX_RETRIES: u32 = 3;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Validate the body of `/v1/test/getcrumb`. Yahoo answers some refusals with 200 and an
/// HTML or JSON error page instead of a crumb.
pub fn parse_crumb(body: &str) -> Result<String, YahooError> {
    let crumb = body.trim();
    if crumb.is_empty() || crumb.len() > 64 || crumb.contains(char::is_whitespace) || crumb.starts_with(['<', '{']) {
        return Err(YahooError::Crumb(format!("unexpected getcrumb body {:?}", crumb)));
    }
    Ok(crumb.to_string())
}

/// Market data and news over the public Yahoo Finance endpoints.
///
/// The quote and quote-summary endpoints require a session cookie plus a matching
/// `crumb` query parameter. The pair is negotiated lazily, shared by clones and renewed
/// once when an endpoint rejects it.
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    rate_limiter: RateLimiter,
    crumb: Arc<Mutex<Option<String>>>,
}

impl YahooFinanceClient {
    /// `rate_limit` is the maximum number of requests per minute.
    pub fn new(rate_limit: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(rate_limit, Duration::from_secs(60)),
            crumb: Arc::new(Mutex::new(None)),
        }
    }

    /// Current session crumb, performing the cookie + getcrumb handshake when none is cached.
    async fn session_crumb(&self) -> Result<String, YahooError> {
        // Held across the handshake so concurrent callers wait for one negotiation.
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        self.rate_limiter.acquire().await;
        if let Err(e) = self.client.get(COOKIE_URL).send().await {
            tracing::debug!("Yahoo cookie request failed, trying crumb anyway: {}", e);
        }

        let url = format!("{}/v1/test/getcrumb", QUERY1_URL);
        let response = self.send_request("getcrumb", self.client.get(&url)).await?;
        let crumb = parse_crumb(&response.text().await?)?;
        tracing::debug!("Negotiated Yahoo session crumb");

        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn clear_crumb(&self) {
        *self.crumb.lock().await = None;
    }

    /// Send a crumb-authenticated request, renewing the session once if it is rejected.
    async fn send_with_crumb<F>(&self, endpoint: &'static str, build: F) -> Result<reqwest::Response, YahooError>
    where
        F: Fn(&str) -> reqwest::RequestBuilder,
    {
        let crumb = self.session_crumb().await?;
        match self.send_request(endpoint, build(&crumb)).await {
            Err(e) if e.is_session_rejected() => {
                tracing::warn!("Yahoo {} rejected the session crumb; renegotiating", endpoint);
                self.clear_crumb().await;
                let crumb = self.session_crumb().await?;
                self.send_request(endpoint, build(&crumb)).await
            }
            other => other,
        }
    }

    fn quote_request(&self, symbol: &str, crumb: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/v7/finance/quote", QUERY1_URL))
            .query(&[("symbols", symbol), ("crumb", crumb)])
    }

    fn quote_summary_request(&self, symbol: &str, crumb: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/v10/finance/quoteSummary/{}", QUERY2_URL, symbol))
            .query(&[("modules", SUMMARY_MODULES), ("crumb", crumb)])
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(
        &self,
        endpoint: &'static str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, YahooError> {
        let request = builder.build()?;

        for attempt in 0..MAX_RETRIES {
            self.rate_limiter.acquire().await;
            let req_clone = match request.try_clone() {
                Some(req) => req,
                None => break,
            };
            let response = self.client.execute(req_clone).await?;

            let status = response.status();
            if status.as_u16() == 429 {
                let wait_secs = 5u64 * (attempt as u64 + 1);
                tracing::warn!(
                    "Yahoo {} rate limited, waiting {}s before retry {}/{}",
                    endpoint, wait_secs, attempt + 1, MAX_RETRIES
                );
                tokio::time::sleep(Duration::from_secs(wait_secs)).await;
                continue;
            }

            if !status.is_success() {
                return Err(YahooError::Status {
                    endpoint,
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            return Ok(response);
        }

        Err(YahooError::RateLimited(MAX_RETRIES))
    }

    /// Raw quote payload (v7 `quote`)
    pub async fn get_quote(&self, symbol: &str) -> Result<Value, YahooError> {
        let response = self
            .send_with_crumb("quote", |crumb| self.quote_request(symbol, crumb))
            .await?;
        Ok(response.json().await?)
    }

    /// Raw quote summary payload (v10 `quoteSummary`) with the valuation modules
    pub async fn get_quote_summary(&self, symbol: &str) -> Result<Value, YahooError> {
        let response = self
            .send_with_crumb("quoteSummary", |crumb| self.quote_summary_request(symbol, crumb))
            .await?;
        Ok(response.json().await?)
    }

    /// Fundamentals from the quote, enriched by the quote summary when it is reachable.
    pub async fn get_fundamentals(&self, symbol: &str) -> Result<Fundamentals, YahooError> {
        let (quote_body, summary_body) =
            tokio::join!(self.get_quote(symbol), self.get_quote_summary(symbol));

        let quote_body = quote_body?;
        let quote = parse::quote_result(&quote_body, symbol)?;

        let summary_body = match summary_body {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::warn!("Quote summary unavailable for {}: {}", symbol, e);
                None
            }
        };
        let summary = summary_body.as_ref().and_then(parse::summary_result);

        Ok(parse::parse_fundamentals(symbol, quote, summary))
    }

    /// Daily closes over the last `lookback_days` calendar days
    pub async fn get_daily_closes(&self, symbol: &str, lookback_days: u32) -> Result<PriceSeries, YahooError> {
        let end = Utc::now();
        let start = end - chrono::Duration::days(i64::from(lookback_days));
        let url = format!("{}/v8/finance/chart/{}", QUERY1_URL, symbol);

        let response = self
            .send_request(
                "chart",
                self.client.get(&url).query(&[
                    ("period1", start.timestamp().to_string()),
                    ("period2", end.timestamp().to_string()),
                    ("interval", "1d".to_string()),
                ]),
            )
            .await?;

        let chart: parse::ChartResponse = response.json().await?;
        parse::parse_chart(symbol, chart)
    }

    /// Recent news headlines from the search endpoint
    pub async fn get_news(&self, symbol: &str, max_items: usize) -> Result<Vec<Headline>, YahooError> {
        let url = format!("{}/v1/finance/search", QUERY2_URL);
        let count = max_items.to_string();
        let response = self
            .send_request(
                "search",
                self.client.get(&url).query(&[
                    ("q", symbol),
                    ("quotesCount", "0"),
                    ("newsCount", count.as_str()),
                ]),
            )
            .await?;

        let search: parse::SearchResponse = response.json().await?;
        Ok(parse::parse_news(search, max_items))
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<Fundamentals, AnalysisError> {
        Ok(self.get_fundamentals(symbol).await?)
    }

    async fn fetch_price_series(
        &self,
        symbol: &str,
        lookback_days: u32,
    ) -> Result<PriceSeries, AnalysisError> {
        Ok(self.get_daily_closes(symbol, lookback_days).await?)
    }
}

#[async_trait]
impl NewsProvider for YahooFinanceClient {
    async fn fetch_headlines(
        &self,
        symbol: &str,
        max_items: usize,
    ) -> Result<Vec<Headline>, AnalysisError> {
        Ok(self.get_news(symbol, max_items).await?)
    }
}
