use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YahooError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {endpoint}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("Rate limited by Yahoo Finance after {0} retries")]
    RateLimited(u32),

    #[error("Invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No data for {0}")]
    NotFound(String),

    #[error("Could not obtain a Yahoo session crumb: {0}")]
    Crumb(String),
}

impl YahooError {
    /// The endpoint refused the session crumb or cookie; a fresh handshake may succeed.
    pub fn is_session_rejected(&self) -> bool {
        matches!(self, YahooError::Status { status: 401 | 403, .. })
    }
}

impl From<YahooError> for AnalysisError {
    fn from(err: YahooError) -> Self {
        AnalysisError::ExternalService(err.to_string())
    }
}
