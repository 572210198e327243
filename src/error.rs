use crate::models::TemplateType;

/// Failure kinds of the render-and-package pipeline.
///
/// Every stage terminates the request with exactly one of these; nothing is
/// retried internally.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    /// Caller input is insufficient to render, augment or package.
    #[error("{0}")]
    RequiredParameters(String),

    /// The named template has no catalog entry for the requested type.
    #[error("{kind} template not found: {name}")]
    TemplateNotFound {
        name: String,
        kind: TemplateType,
        /// True when the name came from the request rather than server defaults
        caller_supplied: bool,
    },

    /// Built-in content failed to render.
    #[error("render failed: {0}")]
    Render(String),

    /// Packaging the payload into an ISO or ZIP failed.
    #[error("could not create archive: {0}")]
    ArchiveBuild(String),

    #[error("template catalog error: {0:#}")]
    Catalog(#[from] anyhow::Error),
}

impl BootstrapError {
    pub fn required(msg: impl Into<String>) -> Self {
        Self::RequiredParameters(msg.into())
    }

    /// Mark a not-found error as caused by a template name from the request.
    pub fn supplied_by_caller(self, supplied: bool) -> Self {
        match self {
            Self::TemplateNotFound { name, kind, .. } => Self::TemplateNotFound {
                name,
                kind,
                caller_supplied: supplied,
            },
            other => other,
        }
    }

    /// Whether the caller can fix this failure by changing the request.
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::RequiredParameters(_) => true,
            Self::TemplateNotFound { caller_supplied, .. } => *caller_supplied,
            Self::Render(_) | Self::ArchiveBuild(_) | Self::Catalog(_) => false,
        }
    }
}
