use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Caller-supplied key that scopes supersession.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity(String);

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for UserIdentity {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoId(String);

impl VideoId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub start: f64,
    pub duration: f64,
    pub text: String,
}

impl TranscriptLine {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcript {
    pub language: String,
    /// Auto-generated captions rather than uploaded subtitles.
    pub generated: bool,
    pub lines: Vec<TranscriptLine>,
}

impl Transcript {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.lines.last().map(|l| l.end()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidUrl,
    TranscriptUnavailable,
    MissingCredential,
    GenerationFailed,
    MalformedSummary,
}

/// Unit of the response stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputChunk {
    pub content: String,
    pub is_final: bool,
    pub error: Option<ErrorCode>,
}

impl OutputChunk {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_final: false,
            error: None,
        }
    }

    pub fn terminal() -> Self {
        Self {
            content: String::new(),
            is_final: true,
            error: None,
        }
    }

    /// Final chunk carrying a human-readable message in place of content.
    pub fn failure(error: &PipelineError) -> Self {
        Self {
            content: format!("failed to summarize video: {error}"),
            is_final: true,
            error: error.code(),
        }
    }
}
