use crate::background::VideoSearch;
use crate::config::{Config, SpeechEngine};
use crate::error::GenerateError;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod elevenlabs;
pub mod gtts;
pub mod pexels;

/// Turns narration text into an MP3 at `out_mp3_path`.
///
/// `voice` is engine specific: a language code for Google TTS, a voice id for
/// ElevenLabs. An empty selector means the engine default.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;
    async fn synthesize(&self, text: &str, voice: &str, out_mp3_path: &Path) -> Result<()>;
}

pub fn speech_for(
    cfg: &Config,
    client: reqwest::Client,
) -> Result<Box<dyn SpeechSynthesizer>, GenerateError> {
    match cfg.speech_engine {
        SpeechEngine::Gtts => Ok(Box::new(gtts::GoogleTts::new(client))),
        SpeechEngine::ElevenLabs => {
            let key = cfg.elevenlabs_key().ok_or_else(|| {
                GenerateError::Precondition(format!(
                    "ElevenLabs speech needs an API key: set elevenlabs_api_key or {}",
                    crate::config::ELEVENLABS_KEY_ENV
                ))
            })?;
            Ok(Box::new(elevenlabs::ElevenLabsTts::new(
                client,
                key,
                &cfg.eleven_voice_id,
                &cfg.eleven_model_id,
            )))
        }
    }
}

/// Video search is optional: without a key the curated table is used alone.
pub fn search_for(cfg: &Config, client: reqwest::Client) -> Option<Box<dyn VideoSearch>> {
    cfg.pexels_key()
        .map(|key| Box::new(pexels::PexelsSearch::new(client, key)) as Box<dyn VideoSearch>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gtts_needs_no_credential() {
        let cfg = Config::default();
        let speech = speech_for(&cfg, reqwest::Client::new()).unwrap();
        assert_eq!(speech.name(), "gtts");
    }

    #[test]
    fn elevenlabs_without_key_is_a_precondition_failure() {
        let cfg = Config {
            speech_engine: SpeechEngine::ElevenLabs,
            ..Config::default()
        };
        let err = speech_for(&cfg, reqwest::Client::new()).err().unwrap();
        assert!(matches!(err, GenerateError::Precondition(_)));
    }

    #[test]
    fn search_only_with_key() {
        let mut cfg = Config::default();
        assert!(search_for(&cfg, reqwest::Client::new()).is_none());
        cfg.pexels_api_key = Some("key".to_string());
        assert!(search_for(&cfg, reqwest::Client::new()).is_some());
    }
}
