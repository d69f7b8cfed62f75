use thiserror::Error;

/// Fatal outcomes of a render request. Optional layers never surface here.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("{0}")]
    Precondition(String),

    #[error("speech synthesis failed: {0:#}")]
    Speech(anyhow::Error),

    #[error("background video unavailable: {0:#}")]
    Background(anyhow::Error),

    #[error("could not inspect media: {0:#}")]
    Probe(anyhow::Error),

    #[error("render failed: {0:#}")]
    Render(anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GenerateError>;
