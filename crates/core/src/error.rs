//! Error types for bucket-upload-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bucket-upload-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bucket-upload-core
#[derive(Error, Debug)]
pub enum Error {
    /// Upload root does not exist locally
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A glob was supplied together with a single-file root
    #[error("Cannot use glob '{glob}' with file '{path}': globs only apply to directories")]
    ConflictingGlob { path: PathBuf, glob: String },

    /// Glob pattern failed to compile
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    /// Header key is neither recognized nor a custom metadata key
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Header key appears more than once
    #[error("Duplicate header: {0}")]
    DuplicateHeader(String),

    /// Requested concurrency cannot be satisfied
    #[error("Invalid concurrency {0}: must be at least 1")]
    ConcurrencyConfig(usize),

    /// One or more object uploads failed
    #[error("{} upload(s) failed:\n{}", .0.len(), .0.join("\n"))]
    UploadTask(Vec<String>),

    /// Unknown predefined ACL name
    #[error("Invalid predefined ACL: {0}")]
    InvalidAcl(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload observer rejected an object
    #[error("Upload observer failed: {0}")]
    Observer(String),

    /// Store-object call failed
    #[error("Store operation failed: {0}")]
    StoreObject(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk error
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

// Generic SdkError conversion for all S3 operations
impl<E> From<aws_sdk_s3::error::SdkError<E>> for Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: aws_sdk_s3::error::SdkError<E>) -> Self {
        Error::StoreObject(aws_sdk_s3::error::DisplayErrorContext(&err).to_string())
    }
}

// Streaming file bodies and parts
impl From<aws_sdk_s3::primitives::ByteStreamError> for Error {
    fn from(err: aws_sdk_s3::primitives::ByteStreamError) -> Self {
        Error::StoreObject(err.to_string())
    }
}
