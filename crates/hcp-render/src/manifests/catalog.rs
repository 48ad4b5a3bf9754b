//! Manifest group catalog
//!
//! One group per control plane component, each mapped to the templates it
//! renders. Direct templates are written to the control plane namespace
//! output; user templates are deferred and later wrapped into ConfigMaps for
//! the guest cluster.

use std::fmt;

use super::RenderFlags;

/// A control plane component whose manifests are rendered together
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ManifestGroup {
    /// etcd operator and cluster
    Etcd,
    /// kube-apiserver
    KubeApiServer,
    /// kube-controller-manager
    KubeControllerManager,
    /// kube-scheduler
    KubeScheduler,
    /// Guest cluster bootstrap objects, discovered from the asset catalog
    ClusterBootstrap,
    /// openshift-apiserver, including the APIService aggregation document
    OpenshiftApiServer,
    /// openshift-controller-manager and cluster-policy-controller
    OpenshiftControllerManager,
    /// oauth-openshift server
    OauthServer,
    /// OpenVPN server and guest client
    OpenVpn,
    /// cluster-version-operator
    ClusterVersionOperator,
    /// Image registry configuration for the guest cluster
    Registry,
    /// Bootstrapper pod and the wrapped user manifests
    UserManifestsBootstrapper,
    /// control-plane-operator
    ControlPlaneOperator,
}

/// Asset directory listed for the cluster-bootstrap group
pub const CLUSTER_BOOTSTRAP_DIR: &str = "cluster-bootstrap";

const ETCD: &[&str] = &[
    "etcd/etcd-cluster-crd.yaml",
    "etcd/etcd-cluster.yaml",
    "etcd/etcd-operator-cluster-role-binding.yaml",
    "etcd/etcd-operator-cluster-role.yaml",
    "etcd/etcd-operator.yaml",
];

const KUBE_APISERVER: &[&str] = &[
    "kube-apiserver/kube-apiserver-deployment.yaml",
    "kube-apiserver/kube-apiserver-service.yaml",
    "kube-apiserver/kube-apiserver-config-configmap.yaml",
    "kube-apiserver/kube-apiserver-oauth-metadata-configmap.yaml",
];

const KUBE_APISERVER_VPN: &[&str] = &["kube-apiserver/kube-apiserver-vpnclient-config.yaml"];

const KUBE_CONTROLLER_MANAGER: &[&str] = &[
    "kube-controller-manager/kube-controller-manager-deployment.yaml",
    "kube-controller-manager/kube-controller-manager-config-configmap.yaml",
];

const KUBE_SCHEDULER: &[&str] = &[
    "kube-scheduler/kube-scheduler-deployment.yaml",
    "kube-scheduler/kube-scheduler-config-configmap.yaml",
];

const OPENSHIFT_APISERVER: &[&str] = &[
    "openshift-apiserver/openshift-apiserver-deployment.yaml",
    "openshift-apiserver/openshift-apiserver-service.yaml",
    "openshift-apiserver/openshift-apiserver-config-configmap.yaml",
];

const OPENSHIFT_APISERVER_USER: &[&str] = &[
    "openshift-apiserver/openshift-apiserver-user-service.yaml",
    "openshift-apiserver/openshift-apiserver-user-endpoint.yaml",
];

const OPENSHIFT_CONTROLLER_MANAGER: &[&str] = &[
    "openshift-controller-manager/openshift-controller-manager-deployment.yaml",
    "openshift-controller-manager/openshift-controller-manager-config-configmap.yaml",
    "openshift-controller-manager/cluster-policy-controller-deployment.yaml",
];

const OPENSHIFT_CONTROLLER_MANAGER_USER: &[&str] = &[
    "openshift-controller-manager/00-openshift-controller-manager-namespace.yaml",
    "openshift-controller-manager/openshift-controller-manager-service-ca.yaml",
];

const OAUTH_SERVER: &[&str] = &[
    "oauth-openshift/oauth-browser-client.yaml",
    "oauth-openshift/oauth-challenging-client.yaml",
    "oauth-openshift/oauth-server-config-configmap.yaml",
    "oauth-openshift/oauth-server-deployment.yaml",
    "oauth-openshift/oauth-server-service.yaml",
    "oauth-openshift/v4-0-config-system-branding.yaml",
    "oauth-openshift/oauth-server-sessionsecret-secret.yaml",
];

const OPENVPN: &[&str] = &[
    "openvpn/openvpn-server-deployment.yaml",
    "openvpn/openvpn-server-service.yaml",
    "openvpn/openvpn-ccd-configmap.yaml",
    "openvpn/openvpn-server-configmap.yaml",
];

const OPENVPN_USER: &[&str] = &[
    "openvpn/openvpn-client-deployment.yaml",
    "openvpn/openvpn-client-configmap.yaml",
];

const CLUSTER_VERSION_OPERATOR: &[&str] =
    &["cluster-version-operator/cluster-version-operator-deployment.yaml"];

const REGISTRY_USER: &[&str] = &["registry/cluster-imageregistry-config.yaml"];

const USER_MANIFESTS_BOOTSTRAPPER: &[&str] =
    &["user-manifests-bootstrapper/user-manifests-bootstrapper-pod.yaml"];

const CONTROL_PLANE_OPERATOR: &[&str] = &["control-plane-operator/cp-operator-deployment.yaml"];

impl ManifestGroup {
    /// Every group in render order
    ///
    /// The bootstrapper comes after every group that defers user manifests
    /// so it packages all of them.
    pub const ORDERED: [ManifestGroup; 13] = [
        ManifestGroup::Etcd,
        ManifestGroup::KubeApiServer,
        ManifestGroup::KubeControllerManager,
        ManifestGroup::KubeScheduler,
        ManifestGroup::ClusterBootstrap,
        ManifestGroup::OpenshiftApiServer,
        ManifestGroup::OpenshiftControllerManager,
        ManifestGroup::OauthServer,
        ManifestGroup::OpenVpn,
        ManifestGroup::ClusterVersionOperator,
        ManifestGroup::Registry,
        ManifestGroup::UserManifestsBootstrapper,
        ManifestGroup::ControlPlaneOperator,
    ];

    /// Short name used in logs
    pub fn name(self) -> &'static str {
        match self {
            ManifestGroup::Etcd => "etcd",
            ManifestGroup::KubeApiServer => "kube-apiserver",
            ManifestGroup::KubeControllerManager => "kube-controller-manager",
            ManifestGroup::KubeScheduler => "kube-scheduler",
            ManifestGroup::ClusterBootstrap => "cluster-bootstrap",
            ManifestGroup::OpenshiftApiServer => "openshift-apiserver",
            ManifestGroup::OpenshiftControllerManager => "openshift-controller-manager",
            ManifestGroup::OauthServer => "oauth-openshift",
            ManifestGroup::OpenVpn => "openvpn",
            ManifestGroup::ClusterVersionOperator => "cluster-version-operator",
            ManifestGroup::Registry => "registry",
            ManifestGroup::UserManifestsBootstrapper => "user-manifests-bootstrapper",
            ManifestGroup::ControlPlaneOperator => "control-plane-operator",
        }
    }

    /// Whether `flags` turn this group on
    pub fn is_enabled(self, flags: &RenderFlags) -> bool {
        match self {
            ManifestGroup::Etcd => flags.etcd,
            ManifestGroup::OauthServer => flags.external_oauth,
            ManifestGroup::OpenVpn => flags.vpn,
            ManifestGroup::Registry => flags.include_registry,
            _ => true,
        }
    }

    /// Templates rendered straight into the output, in order
    pub fn direct_templates(self, flags: &RenderFlags) -> Vec<&'static str> {
        let mut templates = match self {
            ManifestGroup::Etcd => ETCD.to_vec(),
            ManifestGroup::KubeApiServer => KUBE_APISERVER.to_vec(),
            ManifestGroup::KubeControllerManager => KUBE_CONTROLLER_MANAGER.to_vec(),
            ManifestGroup::KubeScheduler => KUBE_SCHEDULER.to_vec(),
            ManifestGroup::OpenshiftApiServer => OPENSHIFT_APISERVER.to_vec(),
            ManifestGroup::OpenshiftControllerManager => OPENSHIFT_CONTROLLER_MANAGER.to_vec(),
            ManifestGroup::OauthServer => OAUTH_SERVER.to_vec(),
            ManifestGroup::OpenVpn => OPENVPN.to_vec(),
            ManifestGroup::ClusterVersionOperator => CLUSTER_VERSION_OPERATOR.to_vec(),
            ManifestGroup::UserManifestsBootstrapper => USER_MANIFESTS_BOOTSTRAPPER.to_vec(),
            ManifestGroup::ControlPlaneOperator => CONTROL_PLANE_OPERATOR.to_vec(),
            ManifestGroup::ClusterBootstrap | ManifestGroup::Registry => Vec::new(),
        };
        if self == ManifestGroup::KubeApiServer && flags.vpn {
            templates.extend_from_slice(KUBE_APISERVER_VPN);
        }
        templates
    }

    /// Templates deferred to the guest cluster, in order
    ///
    /// The cluster-bootstrap group has no fixed list; its members come from
    /// listing [`CLUSTER_BOOTSTRAP_DIR`].
    pub fn user_templates(self) -> &'static [&'static str] {
        match self {
            ManifestGroup::OpenshiftApiServer => OPENSHIFT_APISERVER_USER,
            ManifestGroup::OpenshiftControllerManager => OPENSHIFT_CONTROLLER_MANAGER_USER,
            ManifestGroup::OpenVpn => OPENVPN_USER,
            ManifestGroup::Registry => REGISTRY_USER,
            _ => &[],
        }
    }
}

impl fmt::Display for ManifestGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
