use std::sync::Arc;

use futures_util::Stream;
use tracing::{debug, info, instrument, warn};

use crate::{
    document::SummaryDocument,
    error::{PipelineError, Result},
    extract::extract_video_id,
    generator::{CompletionRequest, GenerationError, SummaryGenerator},
    normalize::normalize_timestamps,
    prompt::PromptBuilder,
    registry::{SupersessionRegistry, Ticket},
    transcript::{TranscriptError, TranscriptFetcher},
    types::{OutputChunk, Transcript, UserIdentity},
};

/// What to do when no transcript can be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptPolicy {
    /// Fail the invocation with `TranscriptUnavailable`.
    #[default]
    Require,
    /// Summarize with an empty transcript.
    AllowEmpty,
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Subtitle languages in order of preference.
    pub languages: Vec<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub transcript_policy: TranscriptPolicy,
    /// Reject completions whose sections are missing or out of order.
    pub validate_document: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            languages: vec!["ko".to_string(), "en".to_string()],
            max_tokens: 2048,
            temperature: 0.7,
            transcript_policy: TranscriptPolicy::Require,
            validate_document: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub user: UserIdentity,
    pub video_url: String,
    pub video_title: String,
}

impl SummaryRequest {
    pub fn new(user: impl Into<UserIdentity>, video_url: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            video_url: video_url.into(),
            video_title: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.video_title = title.into();
        self
    }
}

/// Runs summarization requests under per-user supersession.
#[derive(Clone)]
pub struct PipelineController {
    registry: SupersessionRegistry,
    fetcher: Arc<dyn TranscriptFetcher>,
    generator: Arc<dyn SummaryGenerator>,
    prompt: PromptBuilder,
    options: Arc<PipelineOptions>,
}

impl PipelineController {
    pub fn new(
        registry: SupersessionRegistry,
        fetcher: Arc<dyn TranscriptFetcher>,
        generator: Arc<dyn SummaryGenerator>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            generator,
            prompt: PromptBuilder::default(),
            options: Arc::new(PipelineOptions::default()),
        }
    }

    pub fn with_prompt_builder(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    pub fn registry(&self) -> &SupersessionRegistry {
        &self.registry
    }

    /// Lazily run one invocation.
    ///
    /// Nothing happens until the stream is polled. A completed run yields the normalized
    /// summary followed by an empty final chunk; a failed run yields a single final chunk
    /// with the error message. A run superseded by a newer request for the same user ends
    /// without yielding anything further. Dropping the stream cancels the run and
    /// releases its registry entry.
    pub fn run(
        &self,
        request: SummaryRequest,
    ) -> impl Stream<Item = OutputChunk> + Send + 'static {
        let this = self.clone();

        async_stream::stream! {
            let ticket = this.registry.acquire(request.user.clone()).await;

            match this.summarize(&ticket, &request).await {
                Ok(_) if ticket.is_cancelled() => {
                    debug!(user_id = %request.user, "superseded before emitting; dropping summary");
                }
                Ok(summary) => {
                    yield OutputChunk::content(summary);
                    yield OutputChunk::terminal();
                }
                Err(e) if e.is_cancelled() || ticket.is_cancelled() => {
                    debug!(user_id = %request.user, error = %e, "invocation superseded");
                }
                Err(e) => {
                    warn!(user_id = %request.user, error = %e, "invocation failed");
                    yield OutputChunk::failure(&e);
                }
            }

            drop(ticket);
        }
    }

    #[instrument(
        skip_all,
        fields(user_id = %request.user, ticket_id = %ticket.id())
    )]
    async fn summarize(&self, ticket: &Ticket, request: &SummaryRequest) -> Result<String> {
        let video_id = extract_video_id(&request.video_url)?;
        info!(video_id = %video_id, "summarizing video");

        let fetched = tokio::select! {
            biased;
            _ = ticket.cancelled() => return Err(PipelineError::Cancelled),
            fetched = self.fetcher.fetch(&video_id, &self.options.languages, ticket.token()) => fetched,
        };

        let transcript = match fetched {
            Ok(transcript) if !transcript.is_empty() => transcript,
            Ok(_) => self.missing_transcript(
                &video_id.to_string(),
                TranscriptError::NotFound {
                    languages: self.options.languages.join(", "),
                },
            )?,
            Err(TranscriptError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(source) => self.missing_transcript(&video_id.to_string(), source)?,
        };
        debug!(
            language = %transcript.language,
            lines = transcript.lines.len(),
            duration_s = transcript.duration_seconds(),
            "transcript ready"
        );

        let prompt = self.prompt.build(&request.video_title, &transcript);
        let completion = CompletionRequest {
            system: prompt.system,
            prompt: prompt.user,
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        };

        let raw = tokio::select! {
            biased;
            _ = ticket.cancelled() => return Err(PipelineError::Cancelled),
            raw = self.generator.complete(&completion, ticket.token()) => match raw {
                Err(GenerationError::Cancelled) => return Err(PipelineError::Cancelled),
                raw => raw?,
            },
        };

        if self.options.validate_document {
            let document = SummaryDocument::parse(&raw)?;
            debug!(timeline_entries = document.timeline.len(), "summary validated");
        }

        let summary = normalize_timestamps(&raw);
        info!(chars = summary.chars().count(), "summary ready");
        Ok(summary)
    }

    fn missing_transcript(&self, video_id: &str, source: TranscriptError) -> Result<Transcript> {
        match self.options.transcript_policy {
            TranscriptPolicy::Require => Err(PipelineError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                source,
            }),
            TranscriptPolicy::AllowEmpty => {
                warn!(video_id, error = %source, "no transcript; summarizing without one");
                Ok(Transcript::default())
            }
        }
    }
}
