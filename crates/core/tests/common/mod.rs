#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use recap_core::{
    CompletionRequest, GenerationError, OutputChunk, PipelineController, SummaryGenerator,
    SupersessionRegistry, Transcript, TranscriptError, TranscriptFetcher, TranscriptLine,
    VideoId,
};
use tokio_util::sync::CancellationToken;

pub const DOCUMENT: &str = "__COMMENT|||Nice one.\n\
    __SUMMARY|||A short tour of async Rust.\n\
    __TIMELINE|||\n\
    0.0s ~ 65.0s: Futures\n\
    65.0s ~ 130.5s: Executors\n";

pub const NORMALIZED: &str = "__COMMENT|||Nice one.\n\
    __SUMMARY|||A short tour of async Rust.\n\
    __TIMELINE|||\n\
    [00:00] Futures\n\
    [01:05] Executors\n";

pub fn transcript() -> Transcript {
    Transcript {
        language: "ko".into(),
        generated: false,
        lines: vec![
            TranscriptLine {
                start: 0.0,
                duration: 65.0,
                text: "futures are lazy".into(),
            },
            TranscriptLine {
                start: 65.0,
                duration: 65.5,
                text: "executors poll them".into(),
            },
        ],
    }
}

pub struct FakeFetcher {
    result: Box<dyn Fn() -> Result<Transcript, TranscriptError> + Send + Sync>,
    pub calls: AtomicUsize,
    pub languages: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn returning(transcript: Transcript) -> Arc<Self> {
        Arc::new(Self {
            result: Box::new(move || Ok(transcript.clone())),
            calls: AtomicUsize::new(0),
            languages: Mutex::new(Vec::new()),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            result: Box::new(|| {
                Err(TranscriptError::NotFound {
                    languages: "ko, en".into(),
                })
            }),
            calls: AtomicUsize::new(0),
            languages: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptFetcher for FakeFetcher {
    async fn fetch(
        &self,
        _video_id: &VideoId,
        languages: &[String],
        _cancel: &CancellationToken,
    ) -> Result<Transcript, TranscriptError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.languages.lock().unwrap() = languages.to_vec();
        (self.result)()
    }
}

/// Generator that sleeps, honours cancellation and records how many calls overlap.
pub struct FakeGenerator {
    output: String,
    delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub prompts: Mutex<Vec<CompletionRequest>>,
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FakeGenerator {
    pub fn new(output: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            output: output.to_string(),
            delay,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<CompletionRequest> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SummaryGenerator for FakeGenerator {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::select! {
            _ = cancel.cancelled() => Err(GenerationError::Cancelled),
            _ = tokio::time::sleep(self.delay) => Ok(self.output.clone()),
        }
    }
}

pub fn controller(
    fetcher: Arc<FakeFetcher>,
    generator: Arc<FakeGenerator>,
) -> PipelineController {
    PipelineController::new(SupersessionRegistry::default(), fetcher, generator)
}

/// Every non-cancelled stream ends with exactly one final chunk and nothing after it.
pub fn assert_terminated(chunks: &[OutputChunk]) {
    let finals: Vec<usize> = chunks
        .iter()
        .enumerate()
        .filter(|(_, c)| c.is_final)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(finals, vec![chunks.len() - 1], "chunks: {chunks:?}");
}
