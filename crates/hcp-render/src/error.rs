//! Error types for manifest rendering
//!
//! Two classes matter to callers. Release payload failures come from an
//! external system and may be retried; everything else means the operator
//! build or its configuration is inconsistent and the pass must abort.

use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

/// Main error type for a render pass
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A template could not be loaded, parsed or executed
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Release payload metadata could not be obtained
    #[error("release info error for {release_image}: {message}")]
    Release {
        /// Release image the payload was requested for
        release_image: String,
        /// Description of what failed
        message: String,
        /// Whether retrying the pass may succeed
        retryable: bool,
    },

    /// Cluster parameters are incomplete or malformed
    #[error("validation error for {field}: {message}")]
    Validation {
        /// The offending parameter (e.g., "serviceCIDR")
        field: String,
        /// Description of what's invalid
        message: String,
    },

    /// Two manifests in one pass resolved to the same output name
    #[error("duplicate manifest name: {name}")]
    DuplicateManifest {
        /// The colliding manifest name
        name: String,
    },

    /// The asset catalog could not be read
    #[error("asset error for {name}: {message}")]
    Asset {
        /// Asset or directory name
        name: String,
        /// Description of what failed
        message: String,
    },

    /// Filesystem error while reading inputs or publishing output
    #[error("io error at {}: {source}", .path.display())]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Input document could not be deserialized
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a retryable release error
    pub fn release(release_image: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Release {
            release_image: release_image.into(),
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create a release error caused by malformed input, which retrying cannot fix
    pub fn release_permanent(release_image: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Release {
            release_image: release_image.into(),
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create a validation error for a parameter field
    pub fn validation(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    /// Create an asset catalog error
    pub fn asset(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Asset {
            name: name.into(),
            message: msg.into(),
        }
    }

    /// Create an IO error bound to the path that failed
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Whether the caller may retry the render pass
    ///
    /// Only release payload retrieval can fail transiently. Template, asset and
    /// validation failures point at a defective build and are never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Release {
                retryable: true,
                ..
            }
        )
    }
}
