use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Request rejected before any analysis ran.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A data or sentiment provider failed for one symbol.
    #[error("External service failure: {0}")]
    ExternalService(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Narrative parse error: {0}")]
    NarrativeParse(String),

    /// Every symbol in the batch failed to resolve.
    #[error("Pipeline exhausted: {0}")]
    PipelineExhaustion(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl AnalysisError {
    /// Whether this error must fail the whole request rather than degrade a single candidate.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AnalysisError::Validation(_) | AnalysisError::PipelineExhaustion(_)
        )
    }
}
