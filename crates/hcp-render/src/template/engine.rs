//! Template engine over the asset catalog
//!
//! Uses minijinja with settings that match how manifest templates are written:
//! - Templates are loaded by logical path from an [`AssetSource`]
//! - Strict undefined handling: a missing field or key fails the render
//! - No auto-escaping, whatever the file extension
//! - Trailing newlines are kept so rendered documents concatenate cleanly
//! - Booleans print as `true`/`false`, the way YAML spells them
//! - No builtin global functions, so only cluster parameters and the
//!   registered template functions resolve as top-level names

use std::sync::Arc;

use minijinja::value::ValueKind;
use minijinja::{
    escape_formatter, AutoEscape, Environment, Error, ErrorKind, Output, State, UndefinedBehavior,
    Value,
};
use serde::Serialize;

use super::error::TemplateError;
use super::functions::FunctionRegistry;
use crate::assets::AssetSource;

/// Renders named templates from an asset catalog
///
/// The environment is configured once at construction and only read
/// afterwards. Parsed templates are cached by the loader for the lifetime of
/// the engine.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine {
    /// Create an engine reading templates from `assets`
    ///
    /// `params` is the cluster parameter value nested `include` calls render
    /// against.
    pub fn new(assets: Arc<dyn AssetSource>, functions: &FunctionRegistry, params: Value) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_formatter(format_value);

        // Builtin filters and tests stay; globals such as `namespace` or
        // `range` would shadow missing parameters.
        let builtins: Vec<String> = env.globals().map(|(name, _)| name.to_string()).collect();
        for name in builtins {
            env.remove_global(&name);
        }

        let loader_assets = Arc::clone(&assets);
        env.set_loader(move |name| {
            loader_assets
                .read(name)
                .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))
        });

        functions.install(&mut env, assets, params);

        Self { env }
    }

    /// Render the template `name` against `data`
    ///
    /// # Errors
    ///
    /// - [`TemplateError::NotFound`] if the catalog has no such template
    /// - [`TemplateError::Syntax`] if the template does not parse
    /// - [`TemplateError::Execution`] if rendering references an undefined
    ///   value or a function call fails
    pub fn render<S: Serialize + ?Sized>(
        &self,
        name: &str,
        data: &S,
    ) -> Result<String, TemplateError> {
        let template = self
            .env
            .get_template(name)
            .map_err(|e| TemplateError::from_load(name, e))?;
        template
            .render(data)
            .map_err(|e| TemplateError::from_render(name, e))
    }
}

fn format_value(out: &mut Output, state: &State, value: &Value) -> Result<(), Error> {
    if value.kind() == ValueKind::Bool {
        out.write_str(if value.is_true() { "true" } else { "false" })?;
        return Ok(());
    }
    escape_formatter(out, state, value)
}
