use std::sync::OnceLock;

use regex::Regex;

use crate::{error::PipelineError, types::VideoId};

fn video_id_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/)([^&\n?#/]+)",
            r"youtube\.com/(?:v|shorts)/([^&\n?#/]+)",
            r"youtube\.com/watch\?(?:[^#\n]*&)?v=([^&\n?#/]+)",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Failed to compile video id regex"))
        .collect()
    })
}

/// Extract the video id from a YouTube URL.
///
/// Recognizes `youtu.be/<id>`, `youtube.com/watch?v=<id>` (the `v` parameter may appear
/// anywhere in the query), `youtube.com/embed/<id>`, `youtube.com/v/<id>` and
/// `youtube.com/shorts/<id>`.
pub fn extract_video_id(url: &str) -> Result<VideoId, PipelineError> {
    video_id_patterns()
        .iter()
        .find_map(|re| re.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|m| VideoId::new(m.as_str()))
        .ok_or_else(|| PipelineError::InvalidUrl {
            url: url.to_string(),
        })
}
