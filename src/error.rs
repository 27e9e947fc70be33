//! Error types for spark-mount.

use thiserror::Error;

/// Errors returned by [`mount`](crate::mount::mount) and
/// [`shallow_mount`](crate::mount::shallow_mount).
#[derive(Debug, Error)]
pub enum MountError {
    /// `attach_to` named a selector that matches nothing in the document.
    /// Raised before any DOM node is created.
    #[error("Unable to find the element matching the selector {selector} given as the `attachTo` option")]
    AttachTargetNotFound { selector: String },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    /// The synthetic parent rendered but never registered the component ref.
    #[error("mounted component was not registered under ref `{ref_key}`")]
    RootInstanceMissing { ref_key: String },
}

/// Errors while parsing a CSS selector.
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("invalid selector `{selector}`")]
    Invalid { selector: String },
}

/// Errors while compiling template markup.
#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error("template syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("element <{tag}> is never closed")]
    UnclosedElement { tag: String },

    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedClose { expected: String, found: String },

    #[error("unterminated interpolation in `{text}`")]
    UnterminatedInterpolation { text: String },
}

/// A plugin refused to install. Passed through to the caller unchanged.
#[derive(Debug, Error)]
#[error("plugin `{plugin}` failed to install: {message}")]
pub struct PluginError {
    pub plugin: String,
    pub message: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}
