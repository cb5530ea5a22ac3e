use crate::{format::format_line_range, types::Transcript};

static SUMMARY_INSTRUCTIONS: &str = r#"You are an expert at reading YouTube video transcripts and producing clear, useful summaries.

INPUT: The video title (may be empty) and its transcript, one cue per line in the format
`<start>s ~ <end>s: <text>` where offsets are seconds from the start of the video.

OUTPUT: Exactly three sections, in this order, each starting on its own line with its tag:

__COMMENT|||<one short sentence reacting to the video, like a friend who just watched it>
__SUMMARY|||<a 150-200 character summary of the whole video>
__TIMELINE|||
<start>s ~ <end>s: <what happens in this part>
<start>s ~ <end>s: <what happens in this part>

RULES:
- Write every section in {language}.
- The timeline has between 3 and 10 entries covering the whole video in order.
- Every timeline offset must be copied from the transcript; never invent offsets beyond the
  last cue.
- Keep offsets in seconds with the trailing `s`, exactly as in the input format.
- Output nothing before __COMMENT||| and nothing after the timeline."#;

/// Prompt ready to be sent to the summary generator.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    language: String,
    transcript_char_limit: Option<usize>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new("Korean", Some(Self::DEFAULT_TRANSCRIPT_CHAR_LIMIT))
    }
}

impl PromptBuilder {
    /// Default budget for the serialized transcript, in characters.
    pub const DEFAULT_TRANSCRIPT_CHAR_LIMIT: usize = 60_000;

    /// `transcript_char_limit` of `None` sends the whole transcript.
    pub fn new(language: impl Into<String>, transcript_char_limit: Option<usize>) -> Self {
        Self {
            language: language.into(),
            transcript_char_limit,
        }
    }

    pub fn build(&self, title: &str, transcript: &Transcript) -> RenderedPrompt {
        let system = SUMMARY_INSTRUCTIONS.replace("{language}", &self.language);
        let body = self.render_transcript(transcript);

        RenderedPrompt {
            system,
            user: format!("Video title: {}\nTranscript:\n{}", title.trim(), body),
        }
    }

    fn render_transcript(&self, transcript: &Transcript) -> String {
        let mut out = String::new();
        let mut used = 0usize;

        for line in &transcript.lines {
            let rendered = format_line_range(line);
            let cost = rendered.chars().count() + 1;

            if self
                .transcript_char_limit
                .is_some_and(|limit| used + cost > limit)
            {
                out.push_str("...");
                break;
            }

            out.push_str(&rendered);
            out.push('\n');
            used += cost;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TranscriptLine;

    fn transcript(n: usize) -> Transcript {
        Transcript {
            language: "ko".into(),
            generated: false,
            lines: (0..n)
                .map(|i| TranscriptLine {
                    start: i as f64 * 5.0,
                    duration: 5.0,
                    text: format!("line {i}"),
                })
                .collect(),
        }
    }

    #[test]
    fn renders_title_and_ranges() {
        let prompt = PromptBuilder::new("English", None).build("Rust in 100s", &transcript(2));

        assert!(prompt.system.contains("Write every section in English."));
        assert!(prompt.system.contains("__TIMELINE|||"));
        assert_eq!(
            prompt.user,
            "Video title: Rust in 100s\nTranscript:\n0.0s ~ 5.0s: line 0\n5.0s ~ 10.0s: line 1\n"
        );
    }

    #[test]
    fn empty_title_and_transcript_still_render() {
        let prompt = PromptBuilder::default().build("", &Transcript::default());
        assert_eq!(prompt.user, "Video title: \nTranscript:\n");
    }

    #[test]
    fn truncates_on_line_boundary() {
        // rendered lines are 19-21 chars plus the newline
        let prompt = PromptBuilder::new("Korean", Some(50)).build("t", &transcript(10));
        let body = prompt.user.split_once("Transcript:\n").unwrap().1;

        assert_eq!(body, "0.0s ~ 5.0s: line 0\n5.0s ~ 10.0s: line 1\n...");
    }

    #[test]
    fn unlimited_keeps_every_line() {
        let prompt = PromptBuilder::new("Korean", None).build("t", &transcript(500));
        assert_eq!(prompt.user.lines().count(), 502);
        assert!(!prompt.user.ends_with("..."));
    }
}
