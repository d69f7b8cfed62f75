use anyhow::{Context, Result};
use std::path::Path;

#[cfg(target_os = "windows")]
const VIEWER: &str = "explorer";

#[cfg(target_os = "macos")]
const VIEWER: &str = "open";

#[cfg(all(unix, not(target_os = "macos")))]
const VIEWER: &str = "xdg-open";

/// Hands a rendered video to the desktop's default player without waiting.
pub fn open_in_viewer<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.is_file() {
        anyhow::bail!("nothing to play at {}", path.display());
    }

    std::process::Command::new(VIEWER)
        .arg(path)
        .spawn()
        .with_context(|| format!("{} could not open {}", VIEWER, path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_not_opened() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_in_viewer(dir.path().join("missing.mp4")).unwrap_err();
        assert!(err.to_string().contains("nothing to play"));
    }

    #[test]
    fn directories_are_not_opened() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_in_viewer(dir.path()).is_err());
    }
}
