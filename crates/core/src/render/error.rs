use std::path::PathBuf;

use thiserror::Error;

use crate::error::ErrorKind;

/// Errors from capturing, composing, saving or printing a document.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Capture failed: {0}")]
    Capture(String),

    #[error("Captured image is empty ({width}x{height})")]
    EmptyCapture { width: u32, height: u32 },

    #[error("Failed to restore hidden controls: {0}")]
    Restore(String),

    #[error("Failed to write {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize document manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("Cannot split a {media_type} capture across {pages} pages")]
    Unpaginated { media_type: String, pages: usize },

    #[error("Print spooler '{program}' not found")]
    SpoolerNotFound { program: String },

    #[error("Printing failed: {0}")]
    Print(String),
}

impl RenderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::SpoolerNotFound { .. } | RenderError::Unpaginated { .. } => ErrorKind::Validation,
            _ => ErrorKind::Transient,
        }
    }
}
