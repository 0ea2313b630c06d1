//! Print the effective configuration.

use reelforge_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    let mut shown = config.clone();
    mask(&mut shown.api.openai_api_key);
    mask(&mut shown.api.anthropic_api_key);

    eprintln!("# default location: {}", config_file_path().display());
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}

fn mask(key: &mut Option<String>) {
    if let Some(k) = key.as_mut() {
        *k = "***".to_string();
    }
}
