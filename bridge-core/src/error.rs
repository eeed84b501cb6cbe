//! Error types for the bridge.
//!
//! Every failure in this crate is a programmer or configuration error:
//! there is no I/O and nothing is retried. Errors are surfaced at the point
//! where the mistake is made (bind time, parse time, flush time) rather than
//! rendering nothing silently.

/// Errors produced by the bridge, the component host and the markup adapters.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// A component binding was applied without a `Component` entry.
    #[error("no component provided to {handler} binding handler")]
    MissingComponent {
        /// Name the handler was registered under.
        handler: String,
    },

    /// A `data-bind` attribute names a binding with no registered handler.
    #[error("unknown binding: {0}")]
    UnknownBinding(String),

    /// A template id was not found in the registry.
    #[error("template not found: {0}")]
    UnknownTemplate(String),

    /// A `data-bind` attribute could not be parsed.
    #[error("binding syntax error at offset {offset}: {reason}")]
    BindingSyntax {
        /// Byte offset into the binding text.
        offset: usize,
        /// What the parser expected.
        reason: String,
    },

    /// Template or test markup could not be parsed.
    #[error("markup syntax error at offset {offset}: {reason}")]
    MarkupSyntax {
        /// Byte offset into the markup source.
        offset: usize,
        /// What the parser expected.
        reason: String,
    },

    /// A preprocessor with the same name is already part of the chain.
    #[error("preprocessor already installed: {0}")]
    PreprocessorAlreadyInstalled(String),

    /// Updates kept scheduling more updates during a single flush.
    #[error("maximum update depth exceeded: {passes} render passes in one flush")]
    UpdateDepthExceeded {
        /// Number of passes run before giving up.
        passes: usize,
    },

    /// The instance has already been unmounted (or its host dropped).
    #[error("component instance {0} is not mounted")]
    UnmountedInstance(u64),

    /// The host a binding mounts components into no longer exists.
    #[error("component host has been dropped")]
    HostDropped,

    /// A preprocessor pattern failed to compile.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BridgeError>;
