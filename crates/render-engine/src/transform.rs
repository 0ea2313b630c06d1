//! The media-transform collaborator contract.
//!
//! Every invocation carries all of its parameters explicitly; no state is
//! carried from one call to the next. Given identical requests an
//! implementation must produce identical outputs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use reelforge_common::config::RenderConfig;
use reelforge_common::error::ReelResult;
use reelforge_media_model::SourceMedia;

/// Canvas used when an audio source is rendered as a waveform video.
pub const WAVEFORM_CANVAS: (u32, u32) = (1080, 1080);

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSize {
    /// Keep the input resolution.
    Source,
    /// Letterbox into exactly `width`x`height`.
    Fit { width: u32, height: u32 },
}

/// Encoder parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub preset: String,
    pub crf: u32,
    pub audio_codec: String,
    pub audio_bitrate: String,
}

impl EncodeSettings {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            video_codec: config.codec.clone(),
            preset: config.preset.clone(),
            crf: config.crf,
            audio_codec: config.audio_codec.clone(),
            audio_bitrate: config.audio_bitrate.clone(),
        }
    }
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// Styling for burned-in subtitles, as ASS `force_style` values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleStyle {
    pub font_size: u32,
    /// `&HAABBGGRR` primary colour.
    pub primary_colour: String,
    /// `&HAABBGGRR` box colour.
    pub back_colour: String,
}

impl SubtitleStyle {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            font_size: config.subtitle_font_size,
            primary_colour: config.subtitle_font_color.clone(),
            back_colour: config.subtitle_background.clone(),
        }
    }

    /// The `force_style` argument of the subtitles filter.
    pub fn force_style(&self) -> String {
        format!(
            "FontSize={},PrimaryColour={},BackColour={},BorderStyle=3,Outline=2",
            self.font_size, self.primary_colour, self.back_colour
        )
    }
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// One invocation of the media-transform collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRequest {
    pub input: PathBuf,
    pub output: PathBuf,

    /// Cut window in input time. `None` means the whole input.
    pub start_secs: Option<f64>,
    pub end_secs: Option<f64>,

    pub target: TargetSize,

    /// Render the input's audio as a waveform video.
    pub waveform: bool,

    /// Subtitle file to burn into the picture.
    pub burn_subtitles: Option<PathBuf>,

    pub encode: EncodeSettings,
    pub subtitle_style: SubtitleStyle,
}

impl TransformRequest {
    /// Re-encode `input` into `output` unchanged in size.
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, encode: EncodeSettings) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            start_secs: None,
            end_secs: None,
            target: TargetSize::Source,
            waveform: false,
            burn_subtitles: None,
            encode,
            subtitle_style: SubtitleStyle::default(),
        }
    }

    pub fn with_window(mut self, start_secs: f64, end_secs: f64) -> Self {
        self.start_secs = Some(start_secs);
        self.end_secs = Some(end_secs);
        self
    }

    pub fn with_target(mut self, target: TargetSize) -> Self {
        self.target = target;
        self
    }

    pub fn with_waveform(mut self, waveform: bool) -> Self {
        self.waveform = waveform;
        self
    }

    pub fn with_burned_subtitles(mut self, srt: impl Into<PathBuf>, style: SubtitleStyle) -> Self {
        self.burn_subtitles = Some(srt.into());
        self.subtitle_style = style;
        self
    }

    /// Length of the cut window, if bounded.
    pub fn window_secs(&self) -> Option<f64> {
        match (self.start_secs, self.end_secs) {
            (Some(start), Some(end)) => Some((end - start).max(0.0)),
            (None, Some(end)) => Some(end.max(0.0)),
            _ => None,
        }
    }
}

/// Trait for media-transform backends.
#[async_trait]
pub trait MediaTransform: Send + Sync {
    /// Backend name.
    fn name(&self) -> &str;

    /// Check if this backend is available on the system.
    fn is_available(&self) -> bool;

    /// Probe a source file once. Fails with `SourceUnreadable` when the file
    /// is missing or its duration cannot be determined.
    async fn probe(&self, path: &Path) -> ReelResult<SourceMedia>;

    /// Execute one transform. A non-zero exit is an error; callers also
    /// verify that the output exists.
    async fn run(&self, request: &TransformRequest) -> ReelResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_style_from_defaults() {
        let style = SubtitleStyle::default();
        assert_eq!(
            style.force_style(),
            "FontSize=24,PrimaryColour=&H00FFFFFF,BackColour=&H80000000,BorderStyle=3,Outline=2"
        );
    }

    #[test]
    fn test_window_length() {
        let request = TransformRequest::new("in.mp4", "out.mp4", EncodeSettings::default());
        assert_eq!(request.window_secs(), None);
        assert_eq!(request.clone().with_window(10.0, 25.5).window_secs(), Some(15.5));
    }
}
