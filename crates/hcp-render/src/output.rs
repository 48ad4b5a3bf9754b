//! Rendered manifest collection and publication
//!
//! A render pass accumulates every manifest in memory. Nothing touches the
//! output directory until the whole pass has succeeded; [`ManifestOutput::publish`]
//! then writes into a staging directory beside the target and swaps it into
//! place, so the target holds either the previous output or the complete new
//! one.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result};

/// A rendered manifest ready to be written
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedManifest {
    /// Output file name
    pub name: String,
    /// Manifest body
    pub content: String,
}

/// Ordered set of manifests produced by one render pass
///
/// Names are unique; adding a second manifest under an existing name fails.
#[derive(Clone, Debug, Default)]
pub struct ManifestOutput {
    manifests: Vec<RenderedManifest>,
    names: BTreeSet<String>,
}

impl ManifestOutput {
    /// Create an empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a manifest under `name`
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.is_empty() || name == "." || name == ".." || name.contains(&['/', '\\'][..]) {
            return Err(Error::validation(
                "manifest name",
                format!("{:?} is not a plain file name", name),
            ));
        }
        if !self.names.insert(name.clone()) {
            return Err(Error::DuplicateManifest { name });
        }
        self.manifests.push(RenderedManifest {
            name,
            content: content.into(),
        });
        Ok(())
    }

    /// Manifests in the order they were rendered
    pub fn manifests(&self) -> &[RenderedManifest] {
        &self.manifests
    }

    /// Manifest names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Content of the manifest called `name`
    pub fn get(&self, name: &str) -> Option<&str> {
        self.manifests
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.content.as_str())
    }

    /// Number of manifests
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Check if no manifest was rendered
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Write every manifest to `dir`, replacing its previous content
    ///
    /// Files are written to a hidden staging directory next to `dir` which is
    /// renamed over `dir` once complete. A failure before the rename leaves
    /// `dir` untouched.
    pub fn publish(&self, dir: &Path) -> Result<()> {
        let dir_name = dir
            .file_name()
            .ok_or_else(|| Error::validation("output directory", "must name a directory"))?
            .to_string_lossy()
            .into_owned();
        let parent = match dir.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(|e| Error::io(&parent, e))?;

        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}.staging-", dir_name))
            .tempdir_in(&parent)
            .map_err(|e| Error::io(&parent, e))?;

        for manifest in &self.manifests {
            let path = staging.path().join(&manifest.name);
            std::fs::write(&path, &manifest.content).map_err(|e| Error::io(&path, e))?;
        }
        relax_permissions(staging.path())?;

        let previous = parent.join(format!(".{}.previous", dir_name));
        if previous.exists() {
            std::fs::remove_dir_all(&previous).map_err(|e| Error::io(&previous, e))?;
        }

        let had_previous = dir.exists();
        if had_previous {
            std::fs::rename(dir, &previous).map_err(|e| Error::io(dir, e))?;
        }

        if let Err(e) = std::fs::rename(staging.path(), dir) {
            if had_previous {
                if let Err(restore) = std::fs::rename(&previous, dir) {
                    warn!(
                        error = %restore,
                        path = %previous.display(),
                        "failed to restore previous output"
                    );
                }
            }
            return Err(Error::io(dir, e));
        }

        if had_previous {
            if let Err(e) = std::fs::remove_dir_all(&previous) {
                warn!(error = %e, path = %previous.display(), "failed to remove previous output");
            }
        }

        debug!(count = self.manifests.len(), dir = %dir.display(), "published manifests");
        Ok(())
    }
}

/// Staging directories are created owner-only; published output is world readable
#[cfg(unix)]
fn relax_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn relax_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Final path segment of a logical asset path (`a/b/c.yaml` → `c.yaml`)
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
