use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::fs;

pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads a remote asset. Non-success HTTP statuses are errors.
#[async_trait]
pub trait AssetFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetFetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {} for {}", status.as_u16(), url);
        }

        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {} failed", url))?;
        Ok(bytes.to_vec())
    }
}

pub fn is_remote(location: &str) -> bool {
    let lower = location.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Fetches `url` into `dest`, creating parent directories as needed.
pub async fn fetch_to_file(fetcher: &dyn AssetFetch, url: &str, dest: &Path) -> Result<()> {
    let bytes = fetcher.fetch(url).await?;
    if bytes.is_empty() {
        anyhow::bail!("empty response for {}", url);
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create dir {}", parent.display()))?;
    }
    fs::write(dest, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(())
}
