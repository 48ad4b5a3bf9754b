//! Template error types

use thiserror::Error;

/// Errors that can occur while rendering a named template
///
/// All three are fatal to the render pass: they indicate a defective asset
/// catalog or parameters that do not match what the templates expect.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The asset catalog has no template by this name
    #[error("template not found: {template}")]
    NotFound {
        /// Logical template path
        template: String,
    },

    /// The template does not parse
    #[error("template syntax error in {template}: {source}")]
    Syntax {
        /// Logical template path
        template: String,
        /// Parser error with location
        #[source]
        source: minijinja::Error,
    },

    /// Executing the template failed (undefined field, failing function call)
    #[error("template execution error in {template}: {source}")]
    Execution {
        /// Logical template path
        template: String,
        /// Runtime error with location
        #[source]
        source: minijinja::Error,
    },
}

impl TemplateError {
    /// Name of the template that failed
    pub fn template(&self) -> &str {
        match self {
            Self::NotFound { template }
            | Self::Syntax { template, .. }
            | Self::Execution { template, .. } => template,
        }
    }

    /// Classify an error raised while loading `template`
    pub(crate) fn from_load(template: &str, err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::TemplateNotFound => Self::NotFound {
                template: template.to_string(),
            },
            minijinja::ErrorKind::SyntaxError => Self::Syntax {
                template: template.to_string(),
                source: err,
            },
            _ => Self::Execution {
                template: template.to_string(),
                source: err,
            },
        }
    }

    /// Wrap an error raised while executing `template`
    pub(crate) fn from_render(template: &str, err: minijinja::Error) -> Self {
        Self::Execution {
            template: template.to_string(),
            source: err,
        }
    }
}
