use std::path::PathBuf;

/// All errors the chapter pipeline can produce.
#[derive(Debug, thiserror::Error)]
pub enum ClipperError {
    /// A time token matched the pattern but is not a valid `H:MM:SS` / `M:SS`.
    #[error("invalid timestamp \"{token}\": expected H:MM:SS or M:SS")]
    Format { token: String },

    #[error("nothing to process: {0}")]
    EmptyInput(String),

    #[error("destination already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("{tool} failed ({status}): {stderr}")]
    ExternalTool {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("malformed manifest {path}: {reason}")]
    Manifest { path: PathBuf, reason: String },

    #[error("worker task failed: {0}")]
    Worker(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClipperError {
    pub fn format(token: impl Into<String>) -> Self {
        Self::Format {
            token: token.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClipperError>;
