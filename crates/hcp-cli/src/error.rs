//! Error types for the CLI

use std::path::PathBuf;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Render(#[from] hcp_render::Error),

    #[error("assets directory not found: {path}")]
    AssetsNotFound { path: PathBuf },

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Whether running the same command again may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Render(e) => e.is_retryable(),
            _ => false,
        }
    }
}
