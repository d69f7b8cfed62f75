use crate::{logi, logw};
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;

const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

pub async fn ensure_output_dir(dir: &Path) -> Result<()> {
    if fs::metadata(dir).await.is_err() {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
        logi(format!("Created directory: {}", dir.display()));
    }
    Ok(())
}

pub async fn tool_available(name: &str) -> bool {
    match tokio::process::Command::new(name)
        .arg("-version")
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

/// Warns about every missing media tool; true when all are present.
pub async fn check_ffmpeg() -> bool {
    let mut all = true;
    for tool in REQUIRED_TOOLS {
        if !tool_available(tool).await {
            logw(format!("{} not found in PATH. Please install FFmpeg.", tool));
            all = false;
        }
    }
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("renders").join("today");
        ensure_output_dir(&out).await.unwrap();
        assert!(out.is_dir());
        ensure_output_dir(&out).await.unwrap();
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_missing() {
        assert!(!tool_available("definitely-not-a-real-binary-ksm").await);
    }
}
