//! Render context
//!
//! Couples the cluster parameters, the template engine (with its function
//! registry) and the asset catalog, and records every manifest a pass
//! produces.

use std::sync::Arc;

use minijinja::Value;
use serde::Serialize;
use tracing::debug;

use crate::assets::AssetSource;
use crate::output::{base_name, ManifestOutput};
use crate::params::ClusterParameters;
use crate::template::{FunctionRegistry, TemplateEngine};
use crate::Result;

/// Renders named templates and collects the resulting manifests
pub struct RenderContext {
    params: ClusterParameters,
    params_value: Value,
    assets: Arc<dyn AssetSource>,
    engine: TemplateEngine,
    output: ManifestOutput,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("namespace", &self.params.namespace)
            .field("manifests", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Create a context rendering against `params`
    ///
    /// The function registry is installed here and cannot change afterwards.
    pub fn new(
        params: ClusterParameters,
        assets: Arc<dyn AssetSource>,
        functions: &FunctionRegistry,
    ) -> Self {
        let params_value = Value::from_serialize(&params);
        let engine = TemplateEngine::new(Arc::clone(&assets), functions, params_value.clone());
        Self {
            params,
            params_value,
            assets,
            engine,
            output: ManifestOutput::new(),
        }
    }

    /// Cluster parameters of this pass
    pub fn params(&self) -> &ClusterParameters {
        &self.params
    }

    /// Asset catalog templates are loaded from
    pub fn assets(&self) -> &dyn AssetSource {
        self.assets.as_ref()
    }

    /// Render the template `name` against `data`
    pub fn substitute_params<S: Serialize + ?Sized>(&self, data: &S, name: &str) -> Result<String> {
        Ok(self.engine.render(name, data)?)
    }

    /// Render the template `name` against the cluster parameters
    pub fn render_with_params(&self, name: &str) -> Result<String> {
        Ok(self.engine.render(name, &self.params_value)?)
    }

    /// Render each template against the cluster parameters and record it
    /// under its base file name
    pub fn add_manifest_files(&mut self, names: &[&str]) -> Result<()> {
        for name in names {
            let content = self.render_with_params(name)?;
            self.add_manifest(base_name(name), content)?;
        }
        Ok(())
    }

    /// Record pre-rendered content under an explicit name
    pub fn add_manifest(
        &mut self,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<()> {
        let name = name.into();
        debug!(manifest = %name, "rendered manifest");
        self.output.add(name, content)
    }

    /// Manifests recorded so far
    pub fn output(&self) -> &ManifestOutput {
        &self.output
    }

    /// Finish the pass and hand over the recorded manifests
    pub fn into_output(self) -> ManifestOutput {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::assets::MemoryAssets;
    use crate::release::ReleasePayload;
    use crate::template::TemplateError;
    use crate::Error;

    fn context(assets: MemoryAssets) -> RenderContext {
        let params = ClusterParameters {
            namespace: "hcp-demo".to_string(),
            base_domain: "example.com".to_string(),
            ..Default::default()
        };
        let payload = ReleasePayload::new(
            BTreeMap::from([("cli".to_string(), "quay.io/cli".to_string())]),
            BTreeMap::new(),
        );
        RenderContext::new(
            params,
            Arc::new(assets),
            &FunctionRegistry::new(&payload, false),
        )
    }

    #[test]
    fn test_add_manifest_files_uses_base_names() {
        let mut ctx = context(
            MemoryAssets::new()
                .with("kube-scheduler/deployment.yaml", "ns: {{ namespace }}\n")
                .with("kube-scheduler/config.yaml", "domain: {{ baseDomain }}\n"),
        );
        ctx.add_manifest_files(&["kube-scheduler/deployment.yaml", "kube-scheduler/config.yaml"])
            .unwrap();

        let output = ctx.into_output();
        assert_eq!(output.get("deployment.yaml"), Some("ns: hcp-demo\n"));
        assert_eq!(output.get("config.yaml"), Some("domain: example.com\n"));
    }

    #[test]
    fn test_substitute_params_renders_arbitrary_data() {
        #[derive(Serialize)]
        struct Entry<'a> {
            name: &'a str,
        }
        let ctx = context(
            MemoryAssets::new().with("entry.yaml", "{{ name }}/{{ imageFor(\"cli\") }}"),
        );
        assert_eq!(
            ctx.substitute_params(&Entry { name: "x" }, "entry.yaml").unwrap(),
            "x/quay.io/cli"
        );
    }

    #[test]
    fn test_add_manifest_records_explicit_name() {
        let mut ctx = context(MemoryAssets::new());
        ctx.add_manifest("generated.yaml", "kind: List\n").unwrap();
        assert_eq!(ctx.output().get("generated.yaml"), Some("kind: List\n"));
    }

    #[test]
    fn test_missing_template_fails_without_recording() {
        let mut ctx = context(MemoryAssets::new().with("a/ok.yaml", "ok"));
        let err = ctx.add_manifest_files(&["a/missing.yaml"]).unwrap_err();
        assert!(matches!(err, Error::Template(TemplateError::NotFound { .. })));
        assert!(ctx.output().is_empty());
    }

    #[test]
    fn test_same_base_name_twice_is_rejected() {
        let mut ctx = context(
            MemoryAssets::new()
                .with("a/config.yaml", "a")
                .with("b/config.yaml", "b"),
        );
        let err = ctx
            .add_manifest_files(&["a/config.yaml", "b/config.yaml"])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateManifest { .. }));
    }
}
