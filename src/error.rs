//! Error taxonomy for the viewer. Every failure is contained to one viewer
//! instance; nothing here is fatal to the host.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ViewerError>;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// Open requested with zero matching entries.
    #[error("album has no entries")]
    InvalidAlbum,

    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),

    #[error(transparent)]
    UnsupportedInput(#[from] UnsupportedInputError),

    #[error("viewer is already open")]
    AlreadyOpen,

    #[error("image index {index} out of range for album of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The target image could not be loaded. The loader affordance stays on screen.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to load image {href}: {reason}")]
pub struct ImageLoadError {
    pub href: String,
    pub reason: String,
}

impl ImageLoadError {
    pub fn new(href: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            reason: reason.into(),
        }
    }
}

/// An input capability probe failed; callers fall back to a conservative default.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("input capability probe failed: {0}")]
pub struct UnsupportedInputError(pub String);
