//! Cluster parameter model
//!
//! [`ClusterParameters`] describes the hosted cluster being rendered: network
//! ranges, DNS names and ports, per-component resource requirements, feature
//! gates and release identifiers. It is read from a YAML or JSON document and
//! never mutated afterwards; every template renders against it.
//!
//! Serialized field names are the template-visible names, so a template reads
//! `{{ externalAPIDNSName }}` exactly as the configuration file spells it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::template::functions::parse_cidr;
use crate::{Error, Result};

/// Configuration record for one hosted control plane
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusterParameters {
    /// Management cluster namespace that hosts the control plane
    pub namespace: String,
    /// Public DNS name of the kube-apiserver
    #[serde(rename = "externalAPIDNSName")]
    pub external_api_dns_name: String,
    /// Public port of the kube-apiserver
    #[serde(rename = "externalAPIPort")]
    pub external_api_port: u32,
    /// Public IP address of the kube-apiserver
    #[serde(rename = "externalAPIAddress")]
    pub external_api_ip_address: String,
    /// Public DNS name of the OpenVPN server
    #[serde(rename = "externalVPNDNSName")]
    pub external_openvpn_dns_name: String,
    /// Public port of the OpenVPN server
    #[serde(rename = "externalVPNPort")]
    pub external_openvpn_port: u32,
    /// Public port of the OAuth server
    pub external_oauth_port: u32,
    /// Identity provider configuration, embedded verbatim in the OAuth config
    pub identity_providers: String,
    /// Service network range
    #[serde(rename = "serviceCIDR")]
    pub service_cidr: String,
    /// Additional serving certificates for the kube-apiserver
    pub named_certs: Vec<NamedCert>,
    /// Pod network range
    #[serde(rename = "podCIDR")]
    pub pod_cidr: String,
    /// OpenShift release image the control plane runs
    pub release_image: String,
    /// Node port of the kube-apiserver service
    #[serde(rename = "apiNodePort")]
    pub api_node_port: u32,
    /// Default ingress subdomain
    pub ingress_subdomain: String,
    /// Cluster IP of the openshift-apiserver service
    #[serde(rename = "openshiftAPIClusterIP")]
    pub openshift_api_cluster_ip: String,
    /// HTTP secret of the image registry
    #[serde(rename = "imageRegistryHTTPSecret")]
    pub image_registry_http_secret: String,
    /// Router HTTP node port
    #[serde(rename = "routerNodePortHTTP")]
    pub router_node_port_http: String,
    /// Router HTTPS node port
    #[serde(rename = "routerNodePortHTTPS")]
    pub router_node_port_https: String,
    /// Node port of the OpenVPN server
    #[serde(rename = "openVPNNodePort")]
    pub openvpn_node_port: String,
    /// Base DNS domain of the cluster
    pub base_domain: String,
    /// Cluster network plugin (e.g., "OpenShiftSDN")
    pub network_type: String,
    /// Replica count for control plane deployments
    pub replicas: String,
    /// Client certificate name used against etcd
    pub etcd_client_name: String,
    /// Image prefix used for OKD/origin releases
    pub origin_release_prefix: String,
    /// CA bundle the aggregated OpenShift APIs are served with
    #[serde(rename = "openshiftAPIServerCABundle")]
    pub openshift_api_server_ca_bundle: String,
    /// Cloud provider name passed to the controllers
    pub cloud_provider: String,
    /// Image of the cluster-version-operator setup container
    #[serde(rename = "cvoSetupImage")]
    pub cvo_setup_image: String,
    /// Port the kube-apiserver listens on inside the pod
    #[serde(rename = "internalAPIPort")]
    pub internal_api_port: u32,
    /// Service type of the router (NodePort, LoadBalancer)
    pub router_service_type: String,
    /// kube-apiserver resource requirements
    #[serde(rename = "kubeAPIServerResources")]
    pub kube_api_server_resources: Vec<ResourceRequirements>,
    /// openshift-controller-manager resource requirements
    pub openshift_controller_manager_resources: Vec<ResourceRequirements>,
    /// cluster-version-operator resource requirements
    pub cluster_version_operator_resources: Vec<ResourceRequirements>,
    /// kube-controller-manager resource requirements
    pub kube_controller_manager_resources: Vec<ResourceRequirements>,
    /// openshift-apiserver resource requirements
    #[serde(rename = "openshiftAPIServerResources")]
    pub openshift_api_server_resources: Vec<ResourceRequirements>,
    /// kube-scheduler resource requirements
    pub kube_scheduler_resources: Vec<ResourceRequirements>,
    /// control-plane-operator resource requirements
    pub control_plane_operator_resources: Vec<ResourceRequirements>,
    /// OAuth server resource requirements
    #[serde(rename = "oAuthServerResources")]
    pub oauth_server_resources: Vec<ResourceRequirements>,
    /// cluster-policy-controller resource requirements
    pub cluster_policy_controller_resources: Vec<ResourceRequirements>,
    /// auto-approver resource requirements
    pub auto_approver_resources: Vec<ResourceRequirements>,
    /// OpenVPN client resource requirements
    #[serde(rename = "openVPNClientResources")]
    pub openvpn_client_resources: Vec<ResourceRequirements>,
    /// OpenVPN server resource requirements
    #[serde(rename = "openVPNServerResources")]
    pub openvpn_server_resources: Vec<ResourceRequirements>,
    /// Enable kube-apiserver audit logging
    pub api_server_audit_enabled: bool,
    /// Timestamp annotation that forces a rollout when changed
    pub restart_date: String,
    /// Controllers the control-plane-operator starts
    pub control_plane_operator_controllers: Vec<String>,
    /// Feature gates added on top of the defaults
    pub extra_feature_gates: Vec<String>,
    /// Path checked for kube-apiserver liveness
    pub apiserver_liveness_path: String,
    /// Feature gates enabled for every cluster
    #[serde(alias = "DefaultFeatureGates")]
    pub default_feature_gates: Vec<String>,
    /// Infrastructure platform (e.g., "AWS", "None")
    pub platform_type: String,
}

/// Additional named serving certificate
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NamedCert {
    /// File name prefix of the certificate and key
    pub named_cert_prefix: String,
    /// Domain the certificate serves
    pub named_cert_domain: String,
}

/// Resource limits and requests for one container
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceRequirements {
    /// Resource limits
    pub resource_limit: Vec<ResourceQuantity>,
    /// Resource requests
    pub resource_request: Vec<ResourceQuantity>,
}

/// CPU and memory quantity pair, in Kubernetes quantity notation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceQuantity {
    /// CPU quantity (e.g., "500m")
    pub cpu: String,
    /// Memory quantity (e.g., "1Gi")
    pub memory: String,
}

impl ClusterParameters {
    /// Parse parameters from a YAML or JSON document
    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input)
            .map_err(|e| Error::serialization(format!("invalid cluster parameters: {}", e)))
    }

    /// Load parameters from a YAML or JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&data)
    }

    /// Reject parameters that cannot produce a working control plane
    ///
    /// Checked before any template runs so a broken configuration never
    /// reaches the output directory.
    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(Error::validation("namespace", "must not be empty"));
        }
        if self.release_image.trim().is_empty() {
            return Err(Error::validation("releaseImage", "must not be empty"));
        }
        for (field, cidr) in [("serviceCIDR", &self.service_cidr), ("podCIDR", &self.pod_cidr)] {
            parse_cidr(cidr).map_err(|e| Error::validation(field, e))?;
        }
        Ok(())
    }
}
