use crate::background::CuratedTable;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub const PEXELS_KEY_ENV: &str = "PEXELS_API_KEY";
pub const ELEVENLABS_KEY_ENV: &str = "ELEVENLABS_API_KEY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeechEngine {
    #[default]
    Gtts,
    ElevenLabs,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionStyle {
    #[default]
    Boxed,
    Outlined,
}

/// Heuristic constants. None of these are tuned, so they live in config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub words_per_second: f64,
    pub caption_min_seconds: f64,
    pub caption_max_seconds: f64,
    pub caption_segment_seconds: f64,
    pub title_card_seconds: f64,
    pub music_volume: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            words_per_second: 2.2,
            caption_min_seconds: 1.4,
            caption_max_seconds: 4.0,
            caption_segment_seconds: 2.5,
            title_card_seconds: 3.0,
            music_volume: 0.06,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pexels_api_key: Option<String>,
    #[serde(default)]
    pub elevenlabs_api_key: Option<String>,
    #[serde(default = "default_voice_id")]
    pub eleven_voice_id: String,
    #[serde(default = "default_model_id")]
    pub eleven_model_id: String,
    #[serde(default)]
    pub speech_engine: SpeechEngine,
    #[serde(default)]
    pub caption_style: CaptionStyle,
    #[serde(default)]
    pub tuning: Tuning,
    #[serde(default = "default_music_url")]
    pub music_url: String,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub font_file: Option<PathBuf>,
    #[serde(default)]
    pub curated_backgrounds: CuratedTable,
}

fn default_voice_id() -> String {
    "JBFqnCBsd6RMkjVDRZzb".to_string()
}

fn default_model_id() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_music_url() -> String {
    "https://cdn.pixabay.com/download/audio/2022/03/15/audio_3f2bf7b7a6.mp3?filename=soft-ambient-110241.mp3"
        .to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pexels_api_key: None,
            elevenlabs_api_key: None,
            eleven_voice_id: default_voice_id(),
            eleven_model_id: default_model_id(),
            speech_engine: SpeechEngine::default(),
            caption_style: CaptionStyle::default(),
            tuning: Tuning::default(),
            music_url: default_music_url(),
            output_dir: None,
            font_file: None,
            curated_backgrounds: CuratedTable::default(),
        }
    }
}

impl Config {
    /// Reads `path` if it exists, then layers credentials from the environment.
    /// A missing file is not an error: every field has a default.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if fs::metadata(path).await.is_ok() {
            let content = fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Self::from_json(&content)
                .with_context(|| format!("Failed to parse config: {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(text)?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(PEXELS_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.pexels_api_key = Some(key);
        }
        if let Some(key) = lookup(ELEVENLABS_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.elevenlabs_api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        let t = &self.tuning;
        if !(t.words_per_second > 0.0) {
            anyhow::bail!("config.json: tuning.words_per_second must be positive");
        }
        if !(t.caption_min_seconds > 0.0) || t.caption_min_seconds > t.caption_max_seconds {
            anyhow::bail!("config.json: caption_min_seconds must be in (0, caption_max_seconds]");
        }
        if !(t.caption_segment_seconds > 0.0) {
            anyhow::bail!("config.json: tuning.caption_segment_seconds must be positive");
        }
        if t.title_card_seconds < 0.0 {
            anyhow::bail!("config.json: tuning.title_card_seconds must not be negative");
        }
        if !(t.music_volume > 0.0 && t.music_volume <= 1.0) {
            anyhow::bail!("config.json: tuning.music_volume must be in (0, 1]");
        }
        if self.curated_backgrounds.default_url.trim().is_empty() {
            anyhow::bail!("config.json: curated_backgrounds.default_url missing");
        }
        Ok(())
    }

    pub fn pexels_key(&self) -> Option<&str> {
        non_empty(&self.pexels_api_key)
    }

    pub fn elevenlabs_key(&self) -> Option<&str> {
        non_empty(&self.elevenlabs_api_key)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
