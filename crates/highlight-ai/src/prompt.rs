//! Prompt construction for highlight selection.

use std::fmt::Write as _;

use reelforge_media_model::Transcript;

use crate::selector::SelectionConstraints;

/// Timestamped segments included in the prompt.
pub const MAX_PROMPT_SEGMENTS: usize = 100;

/// Characters of running transcript text included in the prompt.
pub const MAX_PROMPT_TEXT_CHARS: usize = 5000;

/// System instruction for chat-style backends.
pub const SYSTEM_PROMPT: &str =
    "You extract highlights from transcripts for short social media videos. Always return valid JSON.";

/// Build the user prompt for one selection request.
pub fn build_prompt(
    transcript: &Transcript,
    desired_count: usize,
    constraints: &SelectionConstraints,
) -> String {
    let full_text = transcript.full_text();
    let text: String = full_text.chars().take(MAX_PROMPT_TEXT_CHARS).collect();

    let mut segments = String::new();
    for segment in transcript.segments.iter().take(MAX_PROMPT_SEGMENTS) {
        let _ = writeln!(
            segments,
            "[{:.2}s - {:.2}s] {}",
            segment.start_secs,
            segment.end_secs,
            segment.text.trim()
        );
    }

    let min = constraints.min_duration_secs;
    let max = constraints.max_duration_secs;
    let language = &constraints.language;

    format!(
        r#"You are analyzing a transcript to find the most engaging moments for social media reels.

TRANSCRIPT:
{text}

SEGMENTS WITH TIMESTAMPS:
{segments}
TASK:
Select exactly {desired_count} highlights. Each highlight must be:
1. Engaging and attention-grabbing
2. Understandable out of context
3. Between {min} and {max} seconds long
4. Free of overlap with the other highlights

For each highlight provide:
- start_time: start in seconds, taken from a segment boundary
- end_time: end in seconds, taken from a segment boundary
- hook: one catchy sentence (in {language})
- summary: two or three lines explaining the key point (in {language})
- confidence: 0.0 to 1.0, how good a reel this moment makes

Return ONLY a JSON array of objects with exactly these fields, for example:
[{{"start_time": 12.5, "end_time": 28.3, "hook": "...", "summary": "...", "confidence": 0.9}}]
"#
    )
}
