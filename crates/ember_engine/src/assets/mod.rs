//! Asset management system
//!
//! Resource lookup and image decoding for the texture cache. Decoding is pure
//! CPU work with no GPU dependencies, so it can run on worker threads.

pub mod image_loader;
pub mod source;

pub use image_loader::ImageData;
pub use source::{FileSource, MemorySource, ResourceSource, ResourceType};

use thiserror::Error;

/// Asset loading errors
#[derive(Debug, Error)]
pub enum AssetError {
    /// No resource exists for the requested path
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// The resource exists but its bytes could not be read
    #[error("Failed to read {path}: {reason}")]
    ReadFailed {
        /// Resource path that failed to read
        path: String,
        /// Underlying failure description
        reason: String,
    },

    /// The resource bytes could not be decoded into pixel data
    #[error("Failed to decode image: {0}")]
    DecodeFailed(String),
}
