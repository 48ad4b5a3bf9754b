//! Release payload metadata
//!
//! A release image pins the container image and version of every control plane
//! component. Retrieving that metadata (registry access, pull secrets) happens
//! behind [`ReleaseInfoProvider`]; the renderer only consumes the resulting
//! [`ReleasePayload`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Component images and versions of one release
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleasePayload {
    /// Component name → container image reference
    pub images: BTreeMap<String, String>,
    /// Component name → version string
    pub versions: BTreeMap<String, String>,
}

impl ReleasePayload {
    /// Create a payload from image and version mappings
    pub fn new(images: BTreeMap<String, String>, versions: BTreeMap<String, String>) -> Self {
        Self { images, versions }
    }
}

/// Source of release payload metadata
///
/// Implementations talk to registries or read cached metadata. Failures are
/// reported as [`Error::Release`] so callers can apply their own retry policy.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseInfoProvider {
    /// Fetch the payload of `release_image`
    ///
    /// `origin_release_prefix` is the image prefix used by origin (OKD) builds
    /// and may be empty. `pull_secret_file` holds registry credentials.
    fn release_info(
        &self,
        release_image: &str,
        origin_release_prefix: &str,
        pull_secret_file: &Path,
    ) -> Result<ReleasePayload>;
}

/// Provider that returns a payload known ahead of time
#[derive(Clone, Debug, Default)]
pub struct StaticReleaseInfo {
    payload: ReleasePayload,
}

impl StaticReleaseInfo {
    /// Wrap an existing payload
    pub fn new(payload: ReleasePayload) -> Self {
        Self { payload }
    }
}

impl ReleaseInfoProvider for StaticReleaseInfo {
    fn release_info(
        &self,
        _release_image: &str,
        _origin_release_prefix: &str,
        _pull_secret_file: &Path,
    ) -> Result<ReleasePayload> {
        Ok(self.payload.clone())
    }
}

/// On-disk release metadata document
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseInfoDocument {
    /// Release image the metadata was extracted from
    #[serde(default)]
    release_image: Option<String>,
    #[serde(flatten)]
    payload: ReleasePayload,
}

/// Provider that reads release metadata extracted ahead of time
///
/// The document is YAML or JSON with `images` and `versions` mappings and an
/// optional `releaseImage`. When present, `releaseImage` must match the image
/// being rendered.
#[derive(Clone, Debug)]
pub struct FileReleaseInfo {
    path: PathBuf,
}

impl FileReleaseInfo {
    /// Read metadata from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReleaseInfoProvider for FileReleaseInfo {
    fn release_info(
        &self,
        release_image: &str,
        origin_release_prefix: &str,
        pull_secret_file: &Path,
    ) -> Result<ReleasePayload> {
        debug!(
            release_image,
            origin_release_prefix,
            pull_secret = %pull_secret_file.display(),
            path = %self.path.display(),
            "reading release info"
        );

        // A missing or unreadable file may still appear (e.g. mounted later)
        let data = std::fs::read_to_string(&self.path).map_err(|e| {
            Error::release(
                release_image,
                format!("failed to read {}: {}", self.path.display(), e),
            )
        })?;

        let doc: ReleaseInfoDocument = serde_yaml::from_str(&data).map_err(|e| {
            Error::release_permanent(
                release_image,
                format!("malformed release info {}: {}", self.path.display(), e),
            )
        })?;

        if let Some(recorded) = doc.release_image.as_deref() {
            if recorded != release_image {
                return Err(Error::release_permanent(
                    release_image,
                    format!("release info describes {}", recorded),
                ));
            }
        }

        Ok(doc.payload)
    }
}
