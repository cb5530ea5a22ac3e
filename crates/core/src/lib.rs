//! Recap Core Library
//!
//! Per-user superseding pipeline that fetches a YouTube transcript, asks a language model
//! for a summary and streams it back as output chunks.

pub mod document;
pub mod error;
pub mod extract;
pub mod format;
pub mod generator;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod registry;
pub mod transcript;
pub mod types;

// Re-export commonly used items at crate root
pub use document::{DocumentError, SummaryDocument, TimelineEntry};
pub use error::{PipelineError, Result};
pub use extract::extract_video_id;
pub use format::{format_line_range, format_timestamp, format_transcript_ranges};
pub use generator::{
    ChatCompletionsGenerator, CompletionRequest, GenerationError, SummaryGenerator,
};
pub use normalize::normalize_timestamps;
pub use pipeline::{PipelineController, PipelineOptions, SummaryRequest, TranscriptPolicy};
pub use prompt::{PromptBuilder, RenderedPrompt};
pub use provider::{Provider, ProviderConfig, ProviderError};
pub use registry::{SupersessionRegistry, Ticket};
pub use transcript::{TranscriptError, TranscriptFetcher, YtDlpTranscriptFetcher};
pub use types::{ErrorCode, OutputChunk, Transcript, TranscriptLine, UserIdentity, VideoId};
