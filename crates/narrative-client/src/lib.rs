pub mod error;
pub mod json;
pub mod prompts;

pub use error::{NarrativeError, NarrativeResult};
pub use json::extract_json;

use analysis_core::{
    AnalysisError, CandidateAnalysis, ComparisonResult, Fundamentals, NarrativeGenerator,
    NarrativeRecommendation,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Configuration for the hosted text-generation service
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl NarrativeConfig {
    /// `None` when `GOOGLE_API_KEY` is unset or empty; narrative enrichment is then disabled.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("GOOGLE_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
        Some(Self {
            api_key,
            model: std::env::var("NARRATIVE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("NARRATIVE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(30),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    fn into_text(self) -> NarrativeResult<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(NarrativeError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Narrative generator backed by the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiNarrativeClient {
    client: reqwest::Client,
    config: NarrativeConfig,
}

impl GeminiNarrativeClient {
    pub fn new(config: NarrativeConfig) -> NarrativeResult<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Single-turn text generation with an optional system instruction.
    pub async fn generate(&self, system: Option<&str>, prompt: &str) -> NarrativeResult<String> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
            system_instruction: system.map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NarrativeError::ServiceUnavailable {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body: GenerateResponse = response.json().await?;
        body.into_text()
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiNarrativeClient {
    async fn summarize_rationale(
        &self,
        candidates: &[CandidateAnalysis],
        selection: &ComparisonResult,
    ) -> Result<String, AnalysisError> {
        let prompt = prompts::rationale_prompt(candidates, selection);
        let text = self.generate(None, &prompt).await?;
        Ok(text.trim().to_string())
    }

    async fn narrate_risk(
        &self,
        symbol: &str,
        fundamentals: &Fundamentals,
    ) -> Result<String, AnalysisError> {
        let prompt = prompts::risk_prompt(symbol, fundamentals);
        let text = self.generate(None, &prompt).await?;
        Ok(text.trim().to_string())
    }

    async fn propose_recommendation(
        &self,
        selected: &CandidateAnalysis,
        comparison: &ComparisonResult,
    ) -> Result<NarrativeRecommendation, AnalysisError> {
        let prompt = prompts::recommendation_prompt(selected, comparison);
        let text = self
            .generate(Some(prompts::RECOMMENDATION_SYSTEM), &prompt)
            .await?;
        tracing::debug!("Recommendation output for {}: {} chars", selected.symbol, text.len());
        Ok(json::parse_json(&text)?)
    }
}
