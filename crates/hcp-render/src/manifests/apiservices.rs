//! APIService aggregation for openshift-apiserver
//!
//! Every OpenShift API group-version served by openshift-apiserver needs an
//! APIService object in the guest cluster. They are rendered from one shared
//! template and concatenated into a single deferred document.

use serde::Serialize;

use crate::context::RenderContext;
use crate::Result;

/// API group-versions registered against openshift-apiserver, in output order
pub const API_SERVICES: [&str; 11] = [
    "v1.apps.openshift.io",
    "v1.authorization.openshift.io",
    "v1.build.openshift.io",
    "v1.image.openshift.io",
    "v1.oauth.openshift.io",
    "v1.project.openshift.io",
    "v1.quota.openshift.io",
    "v1.route.openshift.io",
    "v1.security.openshift.io",
    "v1.template.openshift.io",
    "v1.user.openshift.io",
];

/// Per-entry template
pub const SERVICE_TEMPLATE: &str = "openshift-apiserver/service-template.yaml";

/// Name of the combined deferred document
pub const APISERVICES_MANIFEST: &str = "openshift-apiserver-apiservices.yaml";

/// Data the per-entry template renders against
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ApiServiceEntry<'a> {
    /// Full name, e.g. `v1.route.openshift.io`
    #[serde(rename = "APIService")]
    pub api_service: &'a str,
    /// Group without the version segment, e.g. `route.openshift.io`
    #[serde(rename = "APIServiceGroup")]
    pub api_service_group: &'a str,
    /// CA bundle the aggregator uses to trust openshift-apiserver
    #[serde(rename = "OpenshiftAPIServerCABundle")]
    pub ca_bundle: &'a str,
}

impl<'a> ApiServiceEntry<'a> {
    /// Entry for `api_service` trusting `ca_bundle`
    pub fn new(api_service: &'a str, ca_bundle: &'a str) -> Self {
        Self {
            api_service,
            api_service_group: trim_first_segment(api_service),
            ca_bundle,
        }
    }
}

/// Drop the first dot-separated segment (`v1.apps.openshift.io` → `apps.openshift.io`)
///
/// A string without a dot has nothing left and yields `""`.
pub fn trim_first_segment(s: &str) -> &str {
    s.split_once('.').map(|(_, rest)| rest).unwrap_or("")
}

/// Render every entry of [`API_SERVICES`] and concatenate them in order
pub fn render_api_services(ctx: &RenderContext) -> Result<String> {
    let ca_bundle = ctx.params().openshift_api_server_ca_bundle.as_str();
    let mut combined = String::new();
    for api_service in API_SERVICES {
        let entry = ApiServiceEntry::new(api_service, ca_bundle);
        combined.push_str(&ctx.substitute_params(&entry, SERVICE_TEMPLATE)?);
    }
    Ok(combined)
}
