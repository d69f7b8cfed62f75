use crate::api::SpeechSynthesizer;
use crate::logi;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ElevenLabsTts {
    client: Client,
    api_key: String,
    voice_id: String,
    model_id: String,
}

impl ElevenLabsTts {
    pub fn new(client: Client, api_key: &str, voice_id: &str, model_id: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            voice_id: voice_id.to_string(),
            model_id: model_id.to_string(),
        }
    }

    fn endpoint(&self, voice: &str) -> String {
        let voice_id = if voice.trim().is_empty() {
            self.voice_id.as_str()
        } else {
            voice.trim()
        };
        format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}?output_format=mp3_44100_128",
            voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsTts {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str, voice: &str, out_mp3_path: &Path) -> Result<()> {
        if text.trim().is_empty() {
            anyhow::bail!("nothing to synthesize");
        }
        let url = self.endpoint(voice);
        logi(format!("ElevenLabs TTS: {} chars, model {}", text.chars().count(), self.model_id));

        let body = serde_json::json!({
            "text": text,
            "model_id": self.model_id,
        });

        let resp = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context("ElevenLabs request failed")?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            anyhow::bail!("ElevenLabs rejected the API key (HTTP 401)");
        }
        if !status.is_success() {
            let raw = resp.text().await.unwrap_or_default();
            let snippet = raw.chars().take(300).collect::<String>();
            anyhow::bail!("ElevenLabs TTS failed HTTP {}: {}", status.as_u16(), snippet);
        }

        let bytes = resp.bytes().await.context("ElevenLabs response read failed")?;
        if let Some(parent) = out_mp3_path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create dir {}", parent.display()))?;
        }
        fs::write(out_mp3_path, &bytes).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_overrides_configured_voice() {
        let tts = ElevenLabsTts::new(
            Client::new(),
            "k",
            "JBFqnCBsd6RMkjVDRZzb",
            "eleven_multilingual_v2",
        );
        assert!(tts.endpoint("").contains("/text-to-speech/JBFqnCBsd6RMkjVDRZzb?"));
        assert!(tts.endpoint(" abc123 ").contains("/text-to-speech/abc123?"));
    }
}
