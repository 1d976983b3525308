use crate::llm_client::LLMError;
use std::time::Duration;

/// Fatal outcomes of a pipeline run.
///
/// A stage that runs out of attempts without a top verdict is *not* an error;
/// see [`crate::gate::StageStatus::Exhausted`].
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The model kept returning data that does not fit the expected structure.
    #[error("{stage}: output rejected after {attempts} attempt(s): {reason}")]
    SchemaValidation {
        stage: String,
        attempts: u32,
        reason: String,
    },
    /// The provider call itself failed.
    #[error("{stage}: external call failed: {source}")]
    ExternalCall {
        stage: String,
        #[source]
        source: LLMError,
    },
    /// The provider did not answer within the configured budget.
    #[error("{stage}: call timed out after {after:?}")]
    Timeout { stage: String, after: Duration },
    /// The caller supplied input the pipeline cannot work with.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl PipelineError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout { .. })
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
