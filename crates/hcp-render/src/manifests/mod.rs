//! Cluster manifest orchestration
//!
//! [`render_cluster_manifests`] is the single entry point for a render pass:
//!
//! 1. Validate the cluster parameters
//! 2. Fetch the release payload from the [`ReleaseInfoProvider`]
//! 3. Run every enabled [`ManifestGroup`] in catalog order, rendering direct
//!    manifests and collecting deferred ones
//! 4. Wrap the deferred manifests (as part of the bootstrapper group)
//! 5. Publish the complete output directory
//!
//! Any failure aborts the pass before step 5, so the output directory never
//! holds a partial render.

pub mod apiservices;
pub mod catalog;
pub mod user_manifests;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::assets::AssetSource;
use crate::context::RenderContext;
use crate::output::ManifestOutput;
use crate::params::ClusterParameters;
use crate::release::{ReleaseInfoProvider, ReleasePayload};
use crate::template::FunctionRegistry;
use crate::Result;

pub use apiservices::{render_api_services, API_SERVICES};
pub use catalog::ManifestGroup;
pub use user_manifests::{package_user_manifests, user_config_map_name, DeferredManifest};

/// Capability flags selecting the optional manifest groups
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderFlags {
    /// Run etcd inside the control plane namespace
    pub etcd: bool,
    /// Connect the control plane to guest nodes through OpenVPN
    pub vpn: bool,
    /// Serve OAuth from the control plane
    pub external_oauth: bool,
    /// Configure the guest cluster image registry
    pub include_registry: bool,
}

/// Everything one render pass needs
pub struct RenderRequest<'a> {
    /// Cluster to render
    pub params: ClusterParameters,
    /// Source of the release payload
    pub release: &'a dyn ReleaseInfoProvider,
    /// Template catalog
    pub assets: Arc<dyn AssetSource>,
    /// Registry credentials handed to the release provider
    pub pull_secret_file: &'a Path,
    /// Directory replaced by the rendered manifests
    pub output_dir: &'a Path,
    /// Optional groups to render
    pub flags: RenderFlags,
}

/// Outcome of a successful render pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// Manifests applied to the control plane namespace
    pub direct_manifests: usize,
    /// Wrapped manifests bound for the guest cluster
    pub user_manifests: usize,
    /// Every output file name, sorted
    pub names: Vec<String>,
}

impl RenderSummary {
    fn new(output: &ManifestOutput, user_manifests: usize) -> Self {
        Self {
            direct_manifests: output.len() - user_manifests,
            user_manifests,
            names: output.names().map(str::to_string).collect(),
        }
    }
}

/// Render every manifest of a hosted control plane and publish them
///
/// # Errors
///
/// - [`Error::Validation`](crate::Error::Validation) for unusable parameters
/// - [`Error::Release`](crate::Error::Release) if the release payload cannot be
///   fetched; check [`Error::is_retryable`](crate::Error::is_retryable)
/// - [`Error::Template`](crate::Error::Template) for any template failure
/// - [`Error::Io`](crate::Error::Io) if publishing fails
pub fn render_cluster_manifests(request: RenderRequest<'_>) -> Result<RenderSummary> {
    let RenderRequest {
        params,
        release,
        assets,
        pull_secret_file,
        output_dir,
        flags,
    } = request;

    params.validate()?;
    info!(
        namespace = %params.namespace,
        release_image = %params.release_image,
        origin_release_prefix = %params.origin_release_prefix,
        ?flags,
        "rendering cluster manifests"
    );

    let payload = release.release_info(
        &params.release_image,
        &params.origin_release_prefix,
        pull_secret_file,
    )?;
    debug!(
        images = payload.images.len(),
        versions = payload.versions.len(),
        "resolved release payload"
    );

    let (output, summary) = render_to_output(params, &payload, assets, flags)?;
    output.publish(output_dir)?;

    info!(
        direct = summary.direct_manifests,
        user = summary.user_manifests,
        dir = %output_dir.display(),
        "cluster manifests written"
    );
    Ok(summary)
}

/// Run the full pass in memory without fetching a payload or touching disk
pub fn render_to_output(
    params: ClusterParameters,
    payload: &ReleasePayload,
    assets: Arc<dyn AssetSource>,
    flags: RenderFlags,
) -> Result<(ManifestOutput, RenderSummary)> {
    let functions = FunctionRegistry::new(payload, flags.vpn);
    let ctx = RenderContext::new(params, assets, &functions);
    let mut manifests = ClusterManifestContext::new(ctx, flags);
    for group in ManifestGroup::ORDERED {
        if group.is_enabled(&flags) {
            manifests.render_group(group)?;
        }
    }
    let user_manifests = manifests.packaged;
    let output = manifests.ctx.into_output();
    let summary = RenderSummary::new(&output, user_manifests);
    Ok((output, summary))
}

/// Orchestrator state for one pass
struct ClusterManifestContext {
    ctx: RenderContext,
    flags: RenderFlags,
    deferred: Vec<DeferredManifest>,
    packaged: usize,
}

impl ClusterManifestContext {
    fn new(ctx: RenderContext, flags: RenderFlags) -> Self {
        Self {
            ctx,
            flags,
            deferred: Vec::new(),
            packaged: 0,
        }
    }

    fn render_group(&mut self, group: ManifestGroup) -> Result<()> {
        let before = self.ctx.output().len();
        let deferred_before = self.deferred.len();

        self.ctx.add_manifest_files(&group.direct_templates(&self.flags))?;
        let user = group
            .user_templates()
            .iter()
            .map(|path| DeferredManifest::file(*path));
        self.deferred.extend(user);

        match group {
            ManifestGroup::ClusterBootstrap => self.defer_cluster_bootstrap()?,
            ManifestGroup::OpenshiftApiServer => {
                let combined = render_api_services(&self.ctx)?;
                let name = apiservices::APISERVICES_MANIFEST;
                self.deferred.push(DeferredManifest::inline(name, combined));
            }
            ManifestGroup::UserManifestsBootstrapper => {
                let deferred = std::mem::take(&mut self.deferred);
                self.packaged += package_user_manifests(&mut self.ctx, &deferred)?;
            }
            _ => {}
        }

        debug!(
            group = %group,
            written = self.ctx.output().len() - before,
            deferred = self.deferred.len().saturating_sub(deferred_before),
            "rendered manifest group"
        );
        Ok(())
    }

    /// Defer every template found in the cluster-bootstrap asset directory
    fn defer_cluster_bootstrap(&mut self) -> Result<()> {
        let dir = catalog::CLUSTER_BOOTSTRAP_DIR;
        let names = self.ctx.assets().list_dir(dir)?;
        let files = names
            .iter()
            .map(|name| DeferredManifest::file(format!("{}/{}", dir, name)));
        self.deferred.extend(files);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    use crate::assets::MemoryAssets;
    use crate::error::Error;
    use crate::release::MockReleaseInfoProvider;
    use crate::template::TemplateError;

    const ALL_FLAGS: RenderFlags = RenderFlags {
        etcd: true,
        vpn: true,
        external_oauth: true,
        include_registry: true,
    };

    fn params() -> ClusterParameters {
        ClusterParameters {
            namespace: "hcp-demo".to_string(),
            release_image: "quay.io/openshift-release-dev/ocp-release:4.4.0".to_string(),
            service_cidr: "172.31.0.0/16".to_string(),
            pod_cidr: "10.132.0.0/14".to_string(),
            openshift_api_server_ca_bundle: "Q0E=".to_string(),
            ..Default::default()
        }
    }

    fn payload() -> ReleasePayload {
        ReleasePayload::new(
            BTreeMap::from([("hyperkube".to_string(), "quay.io/hk".to_string())]),
            BTreeMap::from([("release".to_string(), "4.4.0".to_string())]),
        )
    }

    /// Catalog with a trivial template for every path any group can reach
    fn assets() -> MemoryAssets {
        catalog(true)
    }

    fn catalog(with_bootstrap: bool) -> MemoryAssets {
        let mut assets = MemoryAssets::new()
            .with(apiservices::SERVICE_TEMPLATE, "- {{ APIServiceGroup }}\n")
            .with(
                user_manifests::USER_MANIFEST_TEMPLATE,
                "name: {{ name }}\n{{ data }}",
            );
        if with_bootstrap {
            assets.insert("cluster-bootstrap/99-pull-secret.yaml", "ns: {{ namespace }}\n");
            assets.insert("cluster-bootstrap/00-namespace.yaml", "kind: Namespace\n");
        }
        for group in ManifestGroup::ORDERED {
            for path in group
                .direct_templates(&ALL_FLAGS)
                .into_iter()
                .chain(group.user_templates().iter().copied())
            {
                let body = format!("# {path}\nimage: {{{{ imageFor(\"hyperkube\") }}}}\n");
                assets.insert(path, body);
            }
        }
        assets
    }

    fn render(flags: RenderFlags) -> Result<(ManifestOutput, RenderSummary)> {
        render_to_output(params(), &payload(), Arc::new(assets()), flags)
    }

    fn direct_names(group: ManifestGroup, flags: &RenderFlags) -> Vec<String> {
        group
            .direct_templates(flags)
            .into_iter()
            .map(|p| crate::output::base_name(p).to_string())
            .collect()
    }

    fn user_names(paths: &[&str]) -> Vec<String> {
        paths
            .iter()
            .map(|p| format!("user-manifest-{}", crate::output::base_name(p)))
            .collect()
    }

    // =========================================================================
    // Story: Flags select exactly the enabled groups
    // =========================================================================

    #[test]
    fn story_flag_to_group_completeness() {
        let flags = RenderFlags {
            etcd: true,
            vpn: false,
            external_oauth: true,
            include_registry: false,
        };
        let (output, summary) = render(flags).unwrap();

        let mut expected = BTreeSet::new();
        for group in [
            ManifestGroup::Etcd,
            ManifestGroup::KubeApiServer,
            ManifestGroup::KubeControllerManager,
            ManifestGroup::KubeScheduler,
            ManifestGroup::OpenshiftApiServer,
            ManifestGroup::OpenshiftControllerManager,
            ManifestGroup::OauthServer,
            ManifestGroup::ClusterVersionOperator,
            ManifestGroup::UserManifestsBootstrapper,
            ManifestGroup::ControlPlaneOperator,
        ] {
            expected.extend(direct_names(group, &flags));
            expected.extend(user_names(group.user_templates()));
        }
        expected.extend(user_names(&[
            "cluster-bootstrap/00-namespace.yaml",
            "cluster-bootstrap/99-pull-secret.yaml",
            apiservices::APISERVICES_MANIFEST,
        ]));

        let actual: BTreeSet<String> = output.names().map(str::to_string).collect();
        assert_eq!(actual, expected);
        assert!(!actual.contains("kube-apiserver-vpnclient-config.yaml"));
        assert!(!actual.contains("openvpn-server-deployment.yaml"));
        assert!(!actual.contains("user-manifest-cluster-imageregistry-config.yaml"));

        // 4 ocm/oas user files, 2 bootstrap files, 1 apiservices aggregate
        assert_eq!(summary.user_manifests, 7);
        assert_eq!(summary.direct_manifests, output.len() - 7);
        assert_eq!(summary.names.len(), output.len());
    }

    #[test]
    fn story_all_flags_add_vpn_registry_and_etcd() {
        let (output, summary) = render(ALL_FLAGS).unwrap();
        for name in [
            "etcd-operator.yaml",
            "kube-apiserver-vpnclient-config.yaml",
            "openvpn-server-configmap.yaml",
            "user-manifest-openvpn-client-deployment.yaml",
            "user-manifest-cluster-imageregistry-config.yaml",
            "oauth-server-sessionsecret-secret.yaml",
        ] {
            assert!(output.get(name).is_some(), "{name} missing");
        }
        assert_eq!(summary.user_manifests, 10);
    }

    #[test]
    fn story_minimal_flags_skip_optional_groups() {
        let (output, _) = render(RenderFlags::default()).unwrap();
        for name in [
            "etcd-cluster.yaml",
            "oauth-server-deployment.yaml",
            "openvpn-server-service.yaml",
        ] {
            assert!(output.get(name).is_none(), "{name} present");
        }
        assert!(output.get("cp-operator-deployment.yaml").is_some());
    }

    // =========================================================================
    // Story: Output is deterministic and ordered
    // =========================================================================

    #[test]
    fn story_identical_inputs_render_identically() {
        let (first, _) = render(ALL_FLAGS).unwrap();
        let (second, _) = render(ALL_FLAGS).unwrap();
        assert_eq!(first.manifests(), second.manifests());
    }

    #[test]
    fn story_groups_render_in_catalog_order() {
        let (output, _) = render(ALL_FLAGS).unwrap();
        let order: Vec<&str> = output.manifests().iter().map(|m| m.name.as_str()).collect();
        let position = |name: &str| order.iter().position(|n| *n == name).unwrap();

        assert_eq!(order[0], "etcd-cluster-crd.yaml");
        assert_eq!(order.last().copied(), Some("cp-operator-deployment.yaml"));
        for (earlier, later) in [
            (
                "user-manifests-bootstrapper-pod.yaml",
                "user-manifest-00-namespace.yaml",
            ),
            (
                "user-manifest-00-namespace.yaml",
                "user-manifest-openshift-apiserver-apiservices.yaml",
            ),
            (
                "user-manifest-cluster-imageregistry-config.yaml",
                "cp-operator-deployment.yaml",
            ),
        ] {
            assert!(position(earlier) < position(later), "{earlier} after {later}");
        }
    }

    #[test]
    fn story_apiservices_document_is_wrapped_once() {
        let (output, _) = render(RenderFlags::default()).unwrap();
        let wrapped = output
            .get("user-manifest-openshift-apiserver-apiservices.yaml")
            .unwrap();
        let expected: String = API_SERVICES
            .iter()
            .map(|s| format!("- {}\n", apiservices::trim_first_segment(s)))
            .collect();
        assert_eq!(
            wrapped,
            format!("name: user-manifest-openshift-apiserver-apiservices\n{expected}")
        );
    }

    // =========================================================================
    // Story: Any failure aborts the pass
    // =========================================================================

    #[test]
    fn story_missing_image_aborts_pass() {
        let empty = ReleasePayload::default();
        let err = render_to_output(params(), &empty, Arc::new(assets()), RenderFlags::default())
            .unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::Execution { .. })));
    }

    #[test]
    fn story_missing_cluster_bootstrap_directory_aborts_pass() {
        let no_bootstrap = Arc::new(catalog(false));
        let err = render_to_output(params(), &payload(), no_bootstrap, RenderFlags::default())
            .unwrap_err();
        assert!(matches!(err, Error::Asset { .. }));
    }

    #[test]
    fn story_release_failure_propagates_without_output() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("manifests");

        let mut release = MockReleaseInfoProvider::new();
        release
            .expect_release_info()
            .withf(|image, prefix, _| image.ends_with(":4.4.0") && prefix.is_empty())
            .times(1)
            .returning(|image, _, _| Err(Error::release(image, "registry unavailable")));

        let err = render_cluster_manifests(RenderRequest {
            params: params(),
            release: &release,
            assets: Arc::new(assets()),
            pull_secret_file: Path::new("/nonexistent/pull-secret"),
            output_dir: &out,
            flags: RenderFlags::default(),
        })
        .unwrap_err();

        assert!(err.is_retryable());
        assert!(!out.exists());
    }

    #[test]
    fn story_invalid_params_fail_before_release_lookup() {
        let root = tempfile::tempdir().unwrap();
        let mut release = MockReleaseInfoProvider::new();
        release.expect_release_info().times(0);

        let err = render_cluster_manifests(RenderRequest {
            params: ClusterParameters::default(),
            release: &release,
            assets: Arc::new(assets()),
            pull_secret_file: Path::new("pull-secret"),
            output_dir: &root.path().join("out"),
            flags: RenderFlags::default(),
        })
        .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn story_successful_pass_publishes_summary_names() {
        let root = tempfile::tempdir().unwrap();
        let out = root.path().join("manifests");
        let mut release = MockReleaseInfoProvider::new();
        release
            .expect_release_info()
            .returning(|_, _, _| Ok(payload()));

        let summary = render_cluster_manifests(RenderRequest {
            params: params(),
            release: &release,
            assets: Arc::new(assets()),
            pull_secret_file: Path::new("pull-secret"),
            output_dir: &out,
            flags: RenderFlags::default(),
        })
        .unwrap();

        let mut on_disk: Vec<String> = std::fs::read_dir(&out)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        on_disk.sort();
        assert_eq!(on_disk, summary.names);
        assert_eq!(
            std::fs::read_to_string(out.join("kube-scheduler-deployment.yaml")).unwrap(),
            "# kube-scheduler/kube-scheduler-deployment.yaml\nimage: quay.io/hk\n"
        );
    }
}
