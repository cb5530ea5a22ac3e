pub mod webvtt;
pub mod ytdlp;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::types::{Transcript, VideoId};

pub use webvtt::parse_webvtt;
pub use ytdlp::YtDlpTranscriptFetcher;

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("no subtitles in any of [{languages}]")]
    NotFound { languages: String },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    ToolFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid subtitle file: {0}")]
    Parse(String),

    #[error("transcript fetch cancelled")]
    Cancelled,
}

/// Transcript retrieval boundary.
///
/// `languages` is ordered by preference. Implementations should stop work once `cancel`
/// fires; the caller also drops the returned future at that point.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    async fn fetch(
        &self,
        video_id: &VideoId,
        languages: &[String],
        cancel: &CancellationToken,
    ) -> Result<Transcript, TranscriptError>;
}
