//! Manifest rendering for OpenShift hosted control planes
//!
//! Turns a [`ClusterParameters`] record plus release-payload metadata into the
//! directory of YAML manifests that stands up a hosted control plane. Output is
//! split in two partitions:
//!
//! - direct manifests, applied to the control plane namespace on the
//!   management cluster
//! - user manifests, wrapped in ConfigMaps and applied to the guest cluster
//!   later by the user-manifests bootstrapper pod
//!
//! # Modules
//!
//! - [`params`] - Cluster parameter model and its validation
//! - [`release`] - Release payload (component images and versions) and its provider seam
//! - [`assets`] - Template asset catalog (directory or in-memory)
//! - [`template`] - Template engine and the function registry exposed to templates
//! - [`context`] - Render context: render a named template, record a manifest
//! - [`manifests`] - Manifest group catalog, orchestration and user-manifest packaging
//! - [`output`] - Rendered manifests and atomic publication to disk
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod assets;
pub mod context;
pub mod error;
pub mod manifests;
pub mod output;
pub mod params;
pub mod release;
pub mod template;

pub use assets::{AssetSource, DirectoryAssets, MemoryAssets};
pub use context::RenderContext;
pub use error::Error;
pub use manifests::{
    render_cluster_manifests, render_to_output, RenderFlags, RenderRequest, RenderSummary,
};
pub use output::{ManifestOutput, RenderedManifest};
pub use params::ClusterParameters;
pub use release::{FileReleaseInfo, ReleaseInfoProvider, ReleasePayload, StaticReleaseInfo};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Prefix shared by every user-manifest ConfigMap and its output file
pub const USER_MANIFEST_PREFIX: &str = "user-manifest-";
