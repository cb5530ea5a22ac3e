use futures_util::StreamExt;
use recap_core::{ErrorCode, OutputChunk, PipelineController, SummaryRequest, UserIdentity};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status};
use tracing::{Instrument, debug, info, instrument};

use crate::proto::{self, SummarizeRequest, SummaryChunk, summary_service_server::SummaryService};

const CHANNEL_CAPACITY: usize = 8;

pub struct SummaryWorker {
    controller: PipelineController,
}

impl SummaryWorker {
    pub fn new(controller: PipelineController) -> Self {
        Self { controller }
    }
}

#[tonic::async_trait]
impl SummaryService for SummaryWorker {
    type SummarizeStream = ReceiverStream<Result<SummaryChunk, Status>>;

    #[instrument(skip_all, fields(user_id = %request.get_ref().user_id))]
    async fn summarize(
        &self,
        request: Request<SummarizeRequest>,
    ) -> Result<Response<Self::SummarizeStream>, Status> {
        let req = request.into_inner();
        if req.user_id.trim().is_empty() {
            return Err(Status::invalid_argument("user_id must not be empty"));
        }
        info!(video_url = %req.video_url, "summarize requested");

        let request = SummaryRequest::new(UserIdentity::new(req.user_id), req.video_url)
            .with_title(req.video_title);
        let mut chunks = Box::pin(self.controller.run(request));
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(
            async move {
                loop {
                    tokio::select! {
                        biased;
                        // dropping `chunks` cancels the run and releases its ticket
                        _ = tx.closed() => {
                            debug!("client went away; cancelling invocation");
                            break;
                        }
                        chunk = chunks.next() => {
                            let Some(chunk) = chunk else { break };
                            if tx.send(Ok(to_proto(chunk))).await.is_err() {
                                debug!("client went away; cancelling invocation");
                                break;
                            }
                        }
                    }
                }
            }
            .in_current_span(),
        );

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

fn to_proto(chunk: OutputChunk) -> SummaryChunk {
    let code = match chunk.error {
        None => proto::ErrorCode::Unspecified,
        Some(ErrorCode::InvalidUrl) => proto::ErrorCode::InvalidUrl,
        Some(ErrorCode::TranscriptUnavailable) => proto::ErrorCode::TranscriptUnavailable,
        Some(ErrorCode::MissingCredential) => proto::ErrorCode::MissingCredential,
        Some(ErrorCode::GenerationFailed) => proto::ErrorCode::GenerationFailed,
        Some(ErrorCode::MalformedSummary) => proto::ErrorCode::MalformedSummary,
    };

    SummaryChunk {
        content: chunk.content,
        is_final: chunk.is_final,
        error_code: code.into(),
    }
}
