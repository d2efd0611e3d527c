use thiserror::Error;

/// Errors from loading a recorded input session.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read input script: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse input script: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
