use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub const COMMENT_TAG: &str = "__COMMENT|||";
pub const SUMMARY_TAG: &str = "__SUMMARY|||";
pub const TIMELINE_TAG: &str = "__TIMELINE|||";

const SECTION_ORDER: [&str; 3] = [COMMENT_TAG, SUMMARY_TAG, TIMELINE_TAG];

#[derive(Debug, Error, PartialEq)]
pub enum DocumentError {
    #[error("missing section {0}")]
    MissingSection(&'static str),

    #[error("section {0} appears more than once")]
    DuplicateSection(&'static str),

    #[error("section {found} appears before {expected}")]
    OutOfOrder {
        expected: &'static str,
        found: &'static str,
    },

    #[error("section {0} is empty")]
    EmptySection(&'static str),

    #[error("timeline has no `<start>s ~ <end>s:` entries")]
    EmptyTimeline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub start: f64,
    pub end: f64,
    pub description: String,
}

/// Model output split into its tagged sections.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryDocument {
    pub comment: String,
    pub summary: String,
    pub timeline: Vec<TimelineEntry>,
}

fn timeline_entry_regex() -> &'static Regex {
    static TIMELINE_ENTRY: OnceLock<Regex> = OnceLock::new();
    TIMELINE_ENTRY.get_or_init(|| {
        Regex::new(r"^\s*(\d+(?:\.\d+)?)s[ \t]*~[ \t]*(\d+(?:\.\d+)?)[ \t]*s:\s*(.*)$")
            .expect("Failed to compile timeline entry regex")
    })
}

impl SummaryDocument {
    /// Split and check a raw completion. Text before the first tag is ignored.
    pub fn parse(raw: &str) -> Result<Self, DocumentError> {
        let mut positions = Vec::with_capacity(SECTION_ORDER.len());
        for tag in SECTION_ORDER {
            let mut found = raw.match_indices(tag).map(|(i, _)| i);
            let first = found.next().ok_or(DocumentError::MissingSection(tag))?;
            if found.next().is_some() {
                return Err(DocumentError::DuplicateSection(tag));
            }
            positions.push((first, tag));
        }

        for pair in positions.windows(2) {
            let (prev_at, prev_tag) = pair[0];
            let (at, tag) = pair[1];
            if at < prev_at {
                return Err(DocumentError::OutOfOrder {
                    expected: prev_tag,
                    found: tag,
                });
            }
        }

        let body = |idx: usize| {
            let (at, tag) = positions[idx];
            let start = at + tag.len();
            let end = positions.get(idx + 1).map(|(i, _)| *i).unwrap_or(raw.len());
            raw[start..end].trim()
        };

        let comment = body(0);
        if comment.is_empty() {
            return Err(DocumentError::EmptySection(COMMENT_TAG));
        }
        let summary = body(1);
        if summary.is_empty() {
            return Err(DocumentError::EmptySection(SUMMARY_TAG));
        }

        let timeline: Vec<TimelineEntry> = body(2)
            .lines()
            .filter_map(|line| timeline_entry_regex().captures(line))
            .filter_map(|caps| {
                Some(TimelineEntry {
                    start: caps[1].parse().ok()?,
                    end: caps[2].parse().ok()?,
                    description: caps[3].trim().to_string(),
                })
            })
            .collect();
        if timeline.is_empty() {
            return Err(DocumentError::EmptyTimeline);
        }

        Ok(Self {
            comment: comment.to_string(),
            summary: summary.to_string(),
            timeline,
        })
    }
}
