use crate::api::SpeechSynthesizer;
use crate::logi;
use crate::overlay::wrap_text;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const TTS_URL: &str = "https://translate.google.com/translate_tts";
/// The endpoint refuses longer inputs.
const MAX_PART_CHARS: usize = 100;
const PART_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_LANGUAGE: &str = "en";

/// Free Google Translate speech, the same service gTTS talks to.
pub struct GoogleTts {
    client: Client,
}

impl GoogleTts {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// `en-uk` -> `en`; empty -> `en`.
pub fn language_code(voice: &str) -> &str {
    voice
        .split('-')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LANGUAGE)
}

pub fn split_for_tts(text: &str) -> Vec<String> {
    wrap_text(text, MAX_PART_CHARS)
        .into_iter()
        .filter(|line| !line.trim().is_empty())
        .collect()
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    fn name(&self) -> &'static str {
        "gtts"
    }

    async fn synthesize(&self, text: &str, voice: &str, out_mp3_path: &Path) -> Result<()> {
        let lang = language_code(voice);
        let parts = split_for_tts(text);
        if parts.is_empty() {
            anyhow::bail!("nothing to synthesize");
        }
        logi(format!("Google TTS: {} part(s), language {}", parts.len(), lang));

        let total = parts.len().to_string();
        let mut audio = Vec::new();
        for (idx, part) in parts.iter().enumerate() {
            let query = [
                ("ie", "UTF-8".to_string()),
                ("client", "tw-ob".to_string()),
                ("tl", lang.to_string()),
                ("q", part.clone()),
                ("total", total.clone()),
                ("idx", idx.to_string()),
                ("textlen", part.chars().count().to_string()),
            ];
            let resp = self
                .client
                .get(TTS_URL)
                .query(&query)
                .timeout(PART_TIMEOUT)
                .send()
                .await
                .context("Google TTS request failed")?;

            let status = resp.status();
            if !status.is_success() {
                anyhow::bail!(
                    "Google TTS failed HTTP {} on part {}/{}",
                    status.as_u16(),
                    idx + 1,
                    parts.len()
                );
            }
            let bytes = resp.bytes().await.context("Google TTS response read failed")?;
            audio.extend_from_slice(&bytes);
        }

        if let Some(parent) = out_mp3_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        fs::write(out_mp3_path, &audio)
            .await
            .with_context(|| format!("Failed to write {}", out_mp3_path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_code_drops_region() {
        assert_eq!(language_code("en-uk"), "en");
        assert_eq!(language_code("ta"), "ta");
        assert_eq!(language_code(""), "en");
        assert_eq!(language_code("-au"), "en");
    }

    #[test]
    fn long_narration_is_split_on_word_boundaries() {
        let text = "Lean thinking removes waste from every process. ".repeat(6);
        let parts = split_for_tts(&text);
        assert!(parts.len() > 2);
        assert!(parts.iter().all(|p| p.chars().count() <= MAX_PART_CHARS));
        assert_eq!(parts.join(" "), text.split_whitespace().collect::<Vec<_>>().join(" "));
    }

    #[test]
    fn blank_text_has_no_parts() {
        assert!(split_for_tts("  \n  ").is_empty());
    }
}
