use thiserror::Error;

use crate::{
    document::DocumentError, generator::GenerationError, transcript::TranscriptError,
    types::ErrorCode,
};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("not a recognized YouTube URL: {url}")]
    InvalidUrl { url: String },

    #[error("no transcript available for {video_id}: {source}")]
    TranscriptUnavailable {
        video_id: String,
        #[source]
        source: TranscriptError,
    },

    #[error("summary generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("model returned a malformed summary: {0}")]
    MalformedDocument(#[from] DocumentError),

    #[error("superseded by a newer request")]
    Cancelled,
}

impl PipelineError {
    /// Code reported to the caller, `None` for cancellation which is never reported.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            PipelineError::InvalidUrl { .. } => Some(ErrorCode::InvalidUrl),
            PipelineError::TranscriptUnavailable { .. } => Some(ErrorCode::TranscriptUnavailable),
            PipelineError::Generation(GenerationError::Provider(_)) => {
                Some(ErrorCode::MissingCredential)
            }
            PipelineError::Generation(GenerationError::Cancelled) => None,
            PipelineError::Generation(_) => Some(ErrorCode::GenerationFailed),
            PipelineError::MalformedDocument(_) => Some(ErrorCode::MalformedSummary),
            PipelineError::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.code().is_none()
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
