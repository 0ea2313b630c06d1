//! SRT subtitle generation.

use std::path::Path;

use reelforge_common::error::ReelResult;
use reelforge_media_model::{Transcript, TranscriptSegment};

/// Slice a transcript to `[start, end)` with times relative to `start`.
///
/// Segments that only partly overlap the window are clipped to it, so every
/// returned cue lies within `[0, end - start]`.
pub fn clip_segments(transcript: &Transcript, start: f64, end: f64) -> Vec<TranscriptSegment> {
    transcript
        .segments_between(start, end)
        .filter_map(|segment| {
            let cue_start = segment.start_secs.max(start) - start;
            let cue_end = segment.end_secs.min(end) - start;
            let text = segment.text.trim();
            (cue_end > cue_start && !text.is_empty())
                .then(|| TranscriptSegment::new(cue_start, cue_end, text))
        })
        .collect()
}

/// Generate SRT subtitle content from transcript segments.
pub fn generate_srt(segments: &[TranscriptSegment]) -> String {
    let mut output = String::new();

    for (i, segment) in segments.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(segment.start_secs),
            format_srt_time(segment.end_secs),
        ));
        output.push_str(segment.text.trim());
        output.push_str("\n\n");
    }

    output
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
pub fn format_srt_time(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Write segments to `path` as SRT. An empty slice writes an empty file.
pub fn save_subtitles(segments: &[TranscriptSegment], path: &Path) -> ReelResult<()> {
    std::fs::write(path, generate_srt(segments))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> Transcript {
        Transcript::new(
            "en",
            vec![
                TranscriptSegment::new(0.0, 4.0, "Before the clip"),
                TranscriptSegment::new(8.0, 12.0, "Straddles the start"),
                TranscriptSegment::new(12.0, 15.5, "Inside"),
                TranscriptSegment::new(18.0, 25.0, "Straddles the end"),
                TranscriptSegment::new(30.0, 31.0, "After the clip"),
            ],
        )
    }

    #[test]
    fn test_srt_generation() {
        let segments = vec![
            TranscriptSegment::new(0.0, 2.5, "Hello world"),
            TranscriptSegment::new(3.0, 5.0, "This is a test"),
        ];

        let srt = generate_srt(&segments);
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello world"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:05,000\nThis is a test"));
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
        // 0.1 + 0.2 style float noise must not drop a millisecond
        assert_eq!(format_srt_time(2.3), "00:00:02,300");
        assert_eq!(format_srt_time(-1.0), "00:00:00,000");
    }

    #[test]
    fn test_clip_segments_rebases_and_clips() {
        let cues = clip_segments(&transcript(), 10.0, 20.0);
        assert_eq!(cues.len(), 3);

        assert_eq!(cues[0].text, "Straddles the start");
        assert!((cues[0].start_secs - 0.0).abs() < 1e-9);
        assert!((cues[0].end_secs - 2.0).abs() < 1e-9);

        assert!((cues[1].start_secs - 2.0).abs() < 1e-9);
        assert!((cues[1].end_secs - 5.5).abs() < 1e-9);

        assert_eq!(cues[2].text, "Straddles the end");
        assert!((cues[2].end_secs - 10.0).abs() < 1e-9);

        for cue in &cues {
            assert!(cue.start_secs >= 0.0 && cue.end_secs <= 10.0);
        }
    }

    #[test]
    fn test_clip_without_speech_is_empty() {
        assert!(clip_segments(&transcript(), 26.0, 29.0).is_empty());
        assert_eq!(generate_srt(&[]), "");
    }

    #[test]
    fn test_save_writes_srt() {
        let dir = tempfile::tempdir().unwrap();
        let cues = clip_segments(&transcript(), 10.0, 20.0);

        let srt = dir.path().join("clip.srt");
        save_subtitles(&cues, &srt).unwrap();
        assert!(std::fs::read_to_string(&srt).unwrap().starts_with("1\n00:00:00,000"));

        let empty = dir.path().join("empty.srt");
        save_subtitles(&[], &empty).unwrap();
        assert_eq!(std::fs::read_to_string(&empty).unwrap(), "");
    }
}
