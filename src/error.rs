//! Error types shared by the download pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run before or instead of downloading
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid url: {0}")]
    InvalidReference(String),

    #[error("{0}")]
    Resolution(String),

    #[error("Failed to create output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("A download is already running")]
    AlreadyRunning,
}

/// Why a single download attempt for one track failed
///
/// All variants are recoverable: the downloader retries the track until its
/// attempts run out, then records the last error on the track.
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The service refused to hand out a download link. Displays the
    /// service's own message so it can be shown to the user verbatim.
    #[error("{message}")]
    LinkRejected {
        status: Option<u16>,
        message: String,
    },

    #[error("no download link in response")]
    MissingLink,

    #[error("invalid download link '{0}'")]
    InvalidLink(String),

    #[error("{0:#}")]
    Transport(anyhow::Error),

    #[error("downloaded file is zero byte.")]
    EmptyFile,

    #[error("failed to save file: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to add tags: {0:#}")]
    Tagging(anyhow::Error),
}

impl AttemptError {
    /// Whether the service rejected the credential used for this attempt
    pub fn is_authorization_rejection(&self) -> bool {
        matches!(
            self,
            AttemptError::LinkRejected {
                status: Some(401 | 403),
                ..
            }
        )
    }
}
