use std::sync::OnceLock;

use regex::Regex;

use crate::{transcript::TranscriptError, types::TranscriptLine};

fn tag_regex() -> &'static Regex {
    static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
    TAG_REGEX.get_or_init(|| Regex::new(r"<[^>]*>").expect("Failed to compile tag regex"))
}

/// Parse a WebVTT subtitle file into transcript lines.
///
/// Cue settings, inline tags and NOTE/STYLE/REGION blocks are dropped. YouTube's rolling
/// auto-captions repeat the previous line at the top of each cue; a payload line equal to
/// the last emitted one is skipped so every spoken line appears once.
pub fn parse_webvtt(input: &str) -> Result<Vec<TranscriptLine>, TranscriptError> {
    let lines: Vec<&str> = input.lines().collect();
    let header = lines
        .first()
        .map(|l| l.trim().trim_start_matches('\u{FEFF}'))
        .unwrap_or_default();
    if !header.starts_with("WEBVTT") {
        return Err(TranscriptError::Parse("no WEBVTT header found".into()));
    }

    let mut out: Vec<TranscriptLine> = Vec::new();
    let mut i = 1;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        if line.starts_with("NOTE") || line.starts_with("STYLE") || line.starts_with("REGION") {
            i = skip_block(&lines, i);
            continue;
        }

        // optional cue identifier
        let timing = if line.contains("-->") {
            line
        } else {
            i += 1;
            match lines.get(i).map(|l| l.trim()) {
                Some(next) if next.contains("-->") => next,
                _ => {
                    i = skip_block(&lines, i.saturating_sub(1));
                    continue;
                }
            }
        };

        let (start, end) = parse_timing(timing)?;
        i += 1;

        while i < lines.len() && !lines[i].trim().is_empty() {
            let text = clean_payload(lines[i]);
            i += 1;

            if text.is_empty() || out.last().is_some_and(|prev| prev.text == text) {
                continue;
            }

            out.push(TranscriptLine {
                start,
                duration: (end - start).max(0.0),
                text,
            });
        }
    }

    Ok(out)
}

fn skip_block(lines: &[&str], mut index: usize) -> usize {
    index += 1;
    while index < lines.len() && !lines[index].trim().is_empty() {
        index += 1;
    }
    index
}

fn clean_payload(line: &str) -> String {
    let stripped = tag_regex().replace_all(line, "");
    let decoded = stripped
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_timing(line: &str) -> Result<(f64, f64), TranscriptError> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| TranscriptError::Parse(format!("invalid timing line: {line}")))?;
    // cue settings follow the end timestamp
    let end = rest.split_whitespace().next().unwrap_or_default();

    Ok((parse_timestamp(start.trim())?, parse_timestamp(end)?))
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm` to seconds.
fn parse_timestamp(timestamp: &str) -> Result<f64, TranscriptError> {
    let invalid = || TranscriptError::Parse(format!("invalid timestamp: {timestamp}"));

    let parts: Vec<&str> = timestamp.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => ("0", *m, *s),
        _ => return Err(invalid()),
    };

    let hours: f64 = hours.parse().map_err(|_| invalid())?;
    let minutes: f64 = minutes.parse().map_err(|_| invalid())?;
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}
