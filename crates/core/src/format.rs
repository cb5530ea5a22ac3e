use crate::types::TranscriptLine;

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u64;
    let secs = (seconds % 60.0) as u64;
    format!("{:02}:{:02}", mins, secs)
}

/// Format one transcript line as a `start ~ end` range, the encoding the model echoes back
pub fn format_line_range(line: &TranscriptLine) -> String {
    format!(
        "{:.1}s ~ {:.1}s: {}",
        line.start,
        line.end(),
        line.text.trim()
    )
}

/// Format transcript lines with ranges, one per line
pub fn format_transcript_ranges(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(format_line_range)
        .collect::<Vec<_>>()
        .join("\n")
}
