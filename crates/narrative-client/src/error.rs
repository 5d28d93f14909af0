use analysis_core::AnalysisError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarrativeError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Service returned HTTP {status}: {body}")]
    ServiceUnavailable { status: u16, body: String },

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("No JSON object in model output")]
    MissingJson,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type NarrativeResult<T> = Result<T, NarrativeError>;

impl From<NarrativeError> for AnalysisError {
    fn from(err: NarrativeError) -> Self {
        match err {
            NarrativeError::MissingJson | NarrativeError::Serialization(_) => {
                AnalysisError::NarrativeParse(err.to_string())
            }
            NarrativeError::RequestFailed(ref e) if e.is_timeout() => {
                AnalysisError::Timeout(err.to_string())
            }
            _ => AnalysisError::ExternalService(err.to_string()),
        }
    }
}
