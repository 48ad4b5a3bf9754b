//! User-manifest packaging
//!
//! Manifests destined for the guest cluster are collected during the pass as
//! [`DeferredManifest`]s. Once every group has run, each one is wrapped into
//! a ConfigMap by the shared wrapper template and written as
//! `user-manifest-<base name>`. The bootstrapper pod applies those ConfigMaps
//! to the guest cluster.

use serde::Serialize;
use tracing::debug;

use crate::context::RenderContext;
use crate::output::base_name;
use crate::{Result, USER_MANIFEST_PREFIX};

/// Wrapper template every deferred manifest is rendered through
pub const USER_MANIFEST_TEMPLATE: &str =
    "user-manifests-bootstrapper/user-manifest-template.yaml";

/// A manifest deferred to the guest cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeferredManifest {
    /// Template rendered against the cluster parameters when packaged
    FileTemplate {
        /// Logical asset path
        path: String,
    },
    /// Content generated during the pass, used verbatim
    InlineContent {
        /// Source file name
        name: String,
        /// Rendered body
        data: String,
    },
}

impl DeferredManifest {
    /// Defer the template at `path`
    pub fn file(path: impl Into<String>) -> Self {
        DeferredManifest::FileTemplate { path: path.into() }
    }

    /// Defer already generated content under `name`
    pub fn inline(name: impl Into<String>, data: impl Into<String>) -> Self {
        DeferredManifest::InlineContent {
            name: name.into(),
            data: data.into(),
        }
    }

    /// File name the wrapper and output names derive from
    pub fn source_name(&self) -> &str {
        match self {
            DeferredManifest::FileTemplate { path } => base_name(path),
            DeferredManifest::InlineContent { name, .. } => base_name(name),
        }
    }

    /// Output file name of the wrapped manifest
    pub fn output_name(&self) -> String {
        format!("{}{}", USER_MANIFEST_PREFIX, self.source_name())
    }
}

/// ConfigMap name for a deferred manifest source file
///
/// Keeps the part before the first `.` and turns `_` into `-`, so
/// `00-foo_bar.yaml` becomes `user-manifest-00-foo-bar`. Anything after the
/// first dot is dropped: `a.b.yaml` becomes `user-manifest-a`.
pub fn user_config_map_name(source: &str) -> String {
    let stem = source.split('.').next().unwrap_or(source);
    format!("{}{}", USER_MANIFEST_PREFIX, stem.replace('_', "-"))
}

/// Data the wrapper template renders against
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UserManifestEntry<'a> {
    /// ConfigMap name
    pub name: &'a str,
    /// Wrapped manifest body
    pub data: &'a str,
}

/// Wrap every deferred manifest, in order, and record the wrappers
///
/// Returns the number of wrapped manifests written.
pub fn package_user_manifests(
    ctx: &mut RenderContext,
    deferred: &[DeferredManifest],
) -> Result<usize> {
    for manifest in deferred {
        let data = match manifest {
            DeferredManifest::FileTemplate { path } => ctx.render_with_params(path)?,
            DeferredManifest::InlineContent { data, .. } => data.clone(),
        };
        let name = user_config_map_name(manifest.source_name());
        let entry = UserManifestEntry {
            name: &name,
            data: &data,
        };
        let wrapped = ctx.substitute_params(&entry, USER_MANIFEST_TEMPLATE)?;
        debug!(source = manifest.source_name(), config_map = %name, "wrapped user manifest");
        ctx.add_manifest(manifest.output_name(), wrapped)?;
    }
    Ok(deferred.len())
}
