use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use recap_core::{
    ChatCompletionsGenerator, PipelineController, PipelineOptions, PromptBuilder, Provider,
    SupersessionRegistry, TranscriptPolicy, YtDlpTranscriptFetcher,
};
use tonic::transport::Server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{proto::summary_service_server::SummaryServiceServer, service::SummaryWorker};

mod service;

pub mod proto {
    tonic::include_proto!("recap.v1");
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Openai,
    Grok,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Clone, Default, ValueEnum)]
enum CliTranscriptPolicy {
    /// Fail when no transcript is available
    #[default]
    Require,
    /// Summarize from the title alone
    AllowEmpty,
}

impl From<CliTranscriptPolicy> for TranscriptPolicy {
    fn from(cli: CliTranscriptPolicy) -> Self {
        match cli {
            CliTranscriptPolicy::Require => TranscriptPolicy::Require,
            CliTranscriptPolicy::AllowEmpty => TranscriptPolicy::AllowEmpty,
        }
    }
}

#[derive(Parser)]
#[command(name = "recap-worker")]
#[command(about = "Stream AI summaries of YouTube videos over gRPC, one active request per user")]
struct Cli {
    /// Address to serve the SummaryService on
    #[arg(long, env = "RECAP_LISTEN_ADDR", default_value = "0.0.0.0:50052")]
    listen: SocketAddr,

    /// AI provider for summary generation
    #[arg(short, long, env = "RECAP_PROVIDER", default_value = "openai")]
    provider: CliProvider,

    /// Override the provider's default model
    #[arg(long, env = "RECAP_MODEL")]
    model: Option<String>,

    /// Override the provider's chat completions endpoint
    #[arg(long, env = "RECAP_API_URL")]
    api_url: Option<String>,

    /// Subtitle languages in order of preference
    #[arg(long, env = "RECAP_LANGUAGES", value_delimiter = ',', default_value = "ko,en")]
    languages: Vec<String>,

    /// Language the summary is written in
    #[arg(long, env = "RECAP_SUMMARY_LANGUAGE", default_value = "Korean")]
    summary_language: String,

    /// Maximum transcript characters sent to the model (0 = no limit)
    #[arg(
        long,
        env = "RECAP_TRANSCRIPT_CHAR_LIMIT",
        default_value_t = PromptBuilder::DEFAULT_TRANSCRIPT_CHAR_LIMIT
    )]
    transcript_char_limit: usize,

    /// How long a new request waits for the one it supersedes to exit
    #[arg(long, env = "RECAP_GRACE_MS", default_value_t = 10_000)]
    grace_ms: u64,

    #[arg(long, env = "RECAP_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: u32,

    #[arg(long, env = "RECAP_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// What to do when a video has no usable subtitles
    #[arg(long, env = "RECAP_TRANSCRIPT_POLICY", default_value = "require")]
    transcript_policy: CliTranscriptPolicy,

    /// Skip checking the summary's section layout
    #[arg(long, env = "RECAP_SKIP_VALIDATION")]
    skip_validation: bool,

    /// Path to the yt-dlp executable
    #[arg(long, env = "RECAP_YT_DLP", default_value = "yt-dlp")]
    yt_dlp: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let provider: Provider = cli.provider.into();

    let mut generator = ChatCompletionsGenerator::from_env(provider);
    if let Some(model) = cli.model {
        generator = generator.with_model(model);
    }
    if let Some(api_url) = cli.api_url {
        generator = generator.with_api_url(api_url);
    }

    if generator.has_api_key() {
        info!(provider = provider.name(), model = generator.model(), "API key is set");
    } else {
        // requests fail individually until the key is provided
        warn!(
            provider = provider.name(),
            env_var = provider.config().env_var,
            "API key is not set"
        );
    }

    let char_limit = (cli.transcript_char_limit > 0).then_some(cli.transcript_char_limit);
    let options = PipelineOptions {
        languages: cli.languages,
        max_tokens: cli.max_tokens,
        temperature: cli.temperature,
        transcript_policy: cli.transcript_policy.into(),
        validate_document: !cli.skip_validation,
    };

    let controller = PipelineController::new(
        SupersessionRegistry::new(Duration::from_millis(cli.grace_ms)),
        Arc::new(YtDlpTranscriptFetcher::new(cli.yt_dlp)),
        Arc::new(generator),
    )
    .with_prompt_builder(PromptBuilder::new(cli.summary_language, char_limit))
    .with_options(options);

    info!(addr = %cli.listen, "recap worker listening");
    Server::builder()
        .add_service(SummaryServiceServer::new(SummaryWorker::new(controller)))
        .serve_with_shutdown(cli.listen, shutdown_signal())
        .await
        .context("gRPC server failed")?;

    info!("recap worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
