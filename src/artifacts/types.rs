//! Artifact types

use chrono::{DateTime, Utc};
use crate::transform::Operation;

/// Metadata for a stored artifact
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    /// File name inside the storage directory (also the download name)
    pub file_name: String,

    /// Operation that produced the artifact
    pub operation: Operation,

    /// Size in bytes
    pub size: u64,

    /// When the artifact was written
    pub created_at: DateTime<Utc>,
}

/// An artifact expires once its age strictly exceeds retention
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, retention: chrono::Duration) -> bool {
    now - created_at > retention
}

/// Outcome of one sweep over the storage directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Regular files examined
    pub scanned: usize,

    /// Files deleted because they outlived retention
    pub removed: usize,

    /// Files that could not be inspected or deleted
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid artifact name: {0}")]
    InvalidName(String),

    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArtifactError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            // Invalid names are reported as missing so probing reveals nothing
            Self::NotFound(_) | Self::InvalidName(_) => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
