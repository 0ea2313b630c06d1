//! Check external tools and API keys.

use reelforge_audio_ai::command_exists;
use reelforge_common::config::{AppConfig, SelectorProviderKind, TranscriptionProviderKind};
use reelforge_render_engine::FfmpegBackend;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("ReelForge System Check");
    println!("{}", "=".repeat(50));

    let ffmpeg = FfmpegBackend::new();
    let mut ready = report("ffmpeg", command_exists("ffmpeg"), "install ffmpeg and put it on PATH");
    ready &= report("ffprobe", ffmpeg.probe_available(), "ffprobe ships with ffmpeg");

    let openai_key = has_key(config.api.openai_api_key.as_deref());
    let anthropic_key = has_key(config.api.anthropic_api_key.as_deref());

    match config.transcription.provider {
        TranscriptionProviderKind::OpenAi => {
            ready &= report(
                "Transcription (OpenAI Whisper): OPENAI_API_KEY",
                openai_key,
                "set OPENAI_API_KEY or api.openai_api_key",
            );
        }
        TranscriptionProviderKind::LocalWhisper => {
            let binary = &config.transcription.local_binary;
            ready &= report(
                &format!("Transcription (local Whisper): {binary}"),
                command_exists(binary),
                "install openai-whisper (pip install openai-whisper)",
            );
        }
    }

    match config.highlights.provider {
        SelectorProviderKind::OpenAi => {
            ready &= report(
                "Highlights (OpenAI): OPENAI_API_KEY",
                openai_key,
                "set OPENAI_API_KEY or api.openai_api_key",
            );
        }
        SelectorProviderKind::Anthropic => {
            ready &= report(
                "Highlights (Anthropic): ANTHROPIC_API_KEY",
                anthropic_key,
                "set ANTHROPIC_API_KEY or api.anthropic_api_key",
            );
        }
    }

    println!();
    if ready {
        println!("Everything needed for `reelforge run` is available.");
    } else {
        println!("Some requirements are missing. See above for fixes.");
    }
    Ok(())
}

fn report(name: &str, ok: bool, fix: &str) -> bool {
    if ok {
        println!("[OK] {name}");
    } else {
        println!("[MISSING] {name}");
        println!("     fix: {fix}");
    }
    ok
}

fn has_key(key: Option<&str>) -> bool {
    key.map(|k| !k.trim().is_empty()).unwrap_or(false)
}
