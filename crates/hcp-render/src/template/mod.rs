//! Manifest templating
//!
//! Templates use minijinja syntax and read cluster parameters by their
//! configuration names:
//!
//! ```text
//! image: {{ imageFor("hyperkube") }}
//! serviceNetwork: {{ address(serviceCIDR) }}/{{ mask(serviceCIDR) }}
//! {% if includeVPN() %}
//! {{ include("kube-apiserver/vpn-sidecar.yaml") }}
//! {% endif %}
//! ```
//!
//! See [`functions`] for the full function table.

mod engine;
mod error;
pub mod functions;

pub use engine::TemplateEngine;
pub use error::TemplateError;
pub use functions::{FunctionRegistry, FUNCTION_NAMES, MAX_INCLUDE_DEPTH};
