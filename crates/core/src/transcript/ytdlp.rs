use std::{
    path::{Path, PathBuf},
    process::Stdio,
};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    transcript::{TranscriptError, TranscriptFetcher, parse_webvtt},
    types::{Transcript, VideoId},
};

/// Fetches subtitles with `yt-dlp`, preferring uploaded subtitles over auto-generated
/// captions and, within each kind, the caller's language order.
pub struct YtDlpTranscriptFetcher {
    program: PathBuf,
}

impl Default for YtDlpTranscriptFetcher {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpTranscriptFetcher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn download_subtitles(
        &self,
        url: &str,
        languages: &[String],
        generated: bool,
        out_dir: &Path,
    ) -> Result<(), TranscriptError> {
        let output_template = out_dir.join("%(id)s.%(ext)s");
        let output = Command::new(&self.program)
            .arg(url)
            .arg("--skip-download")
            .arg(if generated {
                "--write-auto-subs"
            } else {
                "--write-subs"
            })
            .arg("--sub-langs")
            .arg(languages.join(","))
            .arg("--sub-format")
            .arg("vtt")
            .arg("--no-warnings")
            .arg("-o")
            .arg(&output_template)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| TranscriptError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(TranscriptError::ToolFailed {
                program: self.program.display().to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    async fn fetch_kind(
        &self,
        video_id: &VideoId,
        languages: &[String],
        generated: bool,
    ) -> Result<Option<Transcript>, TranscriptError> {
        let url = format!("https://www.youtube.com/watch?v={}", video_id);
        let out_dir = tempfile::tempdir()?;

        self.download_subtitles(&url, languages, generated, out_dir.path())
            .await?;

        let Some((language, path)) = pick_subtitle(out_dir.path(), video_id, languages).await
        else {
            return Ok(None);
        };

        let content = fs::read_to_string(&path).await?;
        let lines = parse_webvtt(&content)?;
        if lines.is_empty() {
            return Ok(None);
        }

        Ok(Some(Transcript {
            language,
            generated,
            lines,
        }))
    }
}

/// First `<id>.<lang>.vtt` present in `dir`, following the preference order.
pub(crate) async fn pick_subtitle(
    dir: &Path,
    video_id: &VideoId,
    languages: &[String],
) -> Option<(String, PathBuf)> {
    for lang in languages {
        let path = dir.join(format!("{}.{}.vtt", video_id, lang));
        if fs::try_exists(&path).await.unwrap_or(false) {
            return Some((lang.clone(), path));
        }
    }
    None
}

#[async_trait]
impl TranscriptFetcher for YtDlpTranscriptFetcher {
    async fn fetch(
        &self,
        video_id: &VideoId,
        languages: &[String],
        cancel: &CancellationToken,
    ) -> Result<Transcript, TranscriptError> {
        for generated in [false, true] {
            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TranscriptError::Cancelled),
                attempt = self.fetch_kind(video_id, languages, generated) => attempt?,
            };

            if let Some(transcript) = attempt {
                debug!(
                    video_id = %video_id,
                    language = %transcript.language,
                    generated,
                    lines = transcript.lines.len(),
                    "subtitles fetched"
                );
                return Ok(transcript);
            }
        }

        Err(TranscriptError::NotFound {
            languages: languages.join(", "),
        })
    }
}
