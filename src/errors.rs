use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid clip duration: {0} (must be > 0)")]
    InvalidDuration(f64),
    #[error("no primary one-shot clip in loaded animation set")]
    MissingPrimaryClip,
    #[error("immersive session unavailable: {0}")]
    SessionUnavailable(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
