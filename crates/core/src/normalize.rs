use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::format::format_timestamp;

fn range_marker_regex() -> &'static Regex {
    static RANGE_MARKER: OnceLock<Regex> = OnceLock::new();
    RANGE_MARKER.get_or_init(|| {
        Regex::new(r"(\d+(?:\.\d+)?)s[ \t]*~[ \t]*(\d+(?:\.\d+)?)[ \t]*s:")
            .expect("Failed to compile range marker regex")
    })
}

/// Rewrite every `<start>s ~ <end>s:` range marker into `[mm:ss]` taken from the start offset.
///
/// Total: text that does not match is passed through untouched, including fragments that
/// look like a marker but lack the trailing colon. Offsets are not checked against each
/// other or against the video length.
pub fn normalize_timestamps(document: &str) -> String {
    range_marker_regex()
        .replace_all(document, |caps: &Captures<'_>| {
            match caps[1].parse::<f64>() {
                Ok(start) => format!("[{}]", format_timestamp(start)),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_start_offset() {
        assert_eq!(normalize_timestamps("12.5s ~ 20.0s: hello"), "[00:12] hello");
        assert_eq!(normalize_timestamps("125.0s ~ 130.0s: x"), "[02:05] x");
        assert_eq!(normalize_timestamps("3s~7s: tight"), "[00:03] tight");
        assert_eq!(normalize_timestamps("3725s ~ 3800 s: late"), "[62:05] late");
    }

    #[test]
    fn rewrites_every_marker_in_a_timeline() {
        let doc = "__TIMELINE|||\n0.0s ~ 30.5s: intro\n30.5s ~ 95.0s: setup\n95.0s ~ 180.2s: demo";
        assert_eq!(
            normalize_timestamps(doc),
            "__TIMELINE|||\n[00:00] intro\n[00:30] setup\n[01:35] demo"
        );
    }

    #[test]
    fn leaves_other_text_alone() {
        let text = "__SUMMARY|||A 3 minute talk about ~ nothing: really.";
        assert_eq!(normalize_timestamps(text), text);
    }

    #[test]
    fn leaves_malformed_markers_alone() {
        assert_eq!(normalize_timestamps("12.5s ~ 20.0s hello"), "12.5s ~ 20.0s hello");
        assert_eq!(normalize_timestamps("12.5 ~ 20.0s: hello"), "12.5 ~ 20.0s: hello");
        assert_eq!(normalize_timestamps("12.5s - 20.0s: hello"), "12.5s - 20.0s: hello");
    }

    #[test]
    fn is_idempotent() {
        let inputs = [
            "12.5s ~ 20.0s: hello",
            "a 1s ~ 2s: b 61s ~ 62s: c",
            "no markers here",
            "half 5s ~ 6s marker",
        ];
        for input in inputs {
            let once = normalize_timestamps(input);
            assert_eq!(normalize_timestamps(&once), once, "input: {input}");
        }
    }
}
