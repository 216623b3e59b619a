//! Runtime errors

use fos_dom::{DomError, NodeId};

/// Errors raised to the caller of a runtime operation
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("<{tag}> has no render function")]
    MissingRender { tag: String },

    #[error("Node {0} is not a mounted component")]
    NotMounted(NodeId),

    #[error("<{tag}> content did not stabilize after {attempts} rebuilds")]
    Unstable { tag: String, attempts: usize },

    #[error("Document error: {0}")]
    Dom(#[from] DomError),

    #[error("Invalid light content: {0}")]
    Markup(#[from] fos_html::ParseError),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Component definition rejected at registration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DefinitionError {
    #[error("'{0}' is not a valid custom element name")]
    InvalidTagName(String),

    #[error("<{tag}> refers to unknown handler '{name}'")]
    UnknownHandler { tag: String, name: String },

    #[error("<{tag}> event selector '{selector}' is invalid: {message}")]
    InvalidSelector { tag: String, selector: String, message: String },
}

/// Component source could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("No component source at '{0}'")]
    NotFound(String),

    #[error("Failed to compile '{path}': {source}")]
    Compile {
        path: String,
        #[source]
        source: fos_template::ParseError,
    },
}
