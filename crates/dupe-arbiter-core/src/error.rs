use std::path::PathBuf;
use thiserror::Error;

use crate::types::ImageId;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the dupe-arbiter library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Destination of a move is already occupied
    #[error("File already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The external comparison engine reported a failure
    #[error("Search engine error: {0}")]
    Search(String),

    /// Handle does not refer to a record in the image store
    #[error("Unknown image handle: {0:?}")]
    UnknownImage(ImageId),

    /// Unknown error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Configuration(err.to_string())
    }
}
