use crate::background::{BackgroundReference, VideoSearch};
use crate::logw;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const SEARCH_URL: &str = "https://api.pexels.com/videos/search";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub videos: Vec<Video>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Video {
    #[serde(default)]
    pub video_files: Vec<VideoFile>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VideoFile {
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub link: Option<String>,
}

impl SearchResponse {
    /// Widest file of the first hit.
    pub fn best_file(&self) -> Option<BackgroundReference> {
        let video = self.videos.first()?;
        video
            .video_files
            .iter()
            .filter_map(|f| {
                let link = f.link.as_deref().map(str::trim).filter(|l| !l.is_empty())?;
                Some((f.width.unwrap_or(0), link))
            })
            .max_by_key(|(width, _)| *width)
            .map(|(width, link)| BackgroundReference {
                source_url: link.to_string(),
                width_hint: width,
            })
    }
}

pub struct PexelsSearch {
    client: Client,
    api_key: String,
}

impl PexelsSearch {
    pub fn new(client: Client, api_key: &str) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
        }
    }

    async fn try_search(&self, query: &str) -> Result<Option<BackgroundReference>> {
        let resp = self
            .client
            .get(SEARCH_URL)
            .header("Authorization", &self.api_key)
            .query(&[("query", query), ("per_page", "1"), ("orientation", "landscape")])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .context("Pexels request failed")?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("Pexels HTTP {}", status.as_u16());
        }
        let body: SearchResponse = resp.json().await.context("Pexels response parse failed")?;
        Ok(body.best_file())
    }
}

#[async_trait]
impl VideoSearch for PexelsSearch {
    async fn search(&self, query: &str) -> Option<BackgroundReference> {
        match self.try_search(query).await {
            Ok(found) => found,
            Err(err) => {
                logw(format!("Pexels search \"{}\" failed: {:#}", query, err));
                None
            }
        }
    }
}
