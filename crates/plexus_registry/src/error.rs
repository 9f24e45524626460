//! Error types for the registry core.

use crate::tag::TagId;

/// Errors returned by registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No entry exists for the `(tag, label)` pair.
    #[error("no entry labelled '{label}' under tag {tag}")]
    NotFound {
        /// The tag that was searched.
        tag: TagId,
        /// The missing label.
        label: String,
    },

    /// A call was made with structurally invalid arguments.
    ///
    /// This is a programming error and is never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The entry exists but holds a different kind of value.
    #[error("entry '{label}' holds {found}, expected {expected}")]
    TypeMismatch {
        /// The label that was looked up.
        label: String,
        /// The requested type.
        expected: &'static str,
        /// What the entry actually holds.
        found: &'static str,
    },

    /// Resolving a deferred reference failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Reading or writing settings failed.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl RegistryError {
    /// Creates a [`Configuration`](Self::Configuration) error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Returns `true` for [`NotFound`](Self::NotFound).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors raised while locating or resolving a deferred reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The path is empty or has an empty segment.
    #[error("invalid import path '{0}'")]
    InvalidPath(String),

    /// No module is declared under this name.
    #[error("no module named '{0}'")]
    ModuleNotFound(String),

    /// An attribute walk hit a missing attribute.
    #[error("'{path}' has no attribute '{attr}'")]
    MissingAttribute {
        /// The value being walked.
        path: String,
        /// The attribute that was not found.
        attr: String,
    },

    /// An include pointed at an attribute that is not a registry.
    #[error("attribute '{attr}' of module '{module}' is not a namespace")]
    NotANamespace {
        /// The included module.
        module: String,
        /// The attribute that was read.
        attr: String,
    },

    /// A module loader reported a failure.
    #[error("failed to load module '{module}': {reason}")]
    Load {
        /// The module being loaded.
        module: String,
        /// Loader-supplied description.
        reason: String,
    },

    /// Resolving an entry required resolving that same entry.
    #[error("'{0}' refers back to itself while resolving")]
    Cycle(String),
}

/// Errors returned by [`Settings`](crate::Settings).
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings were locked before this write.
    #[error("settings are locked; cannot write '{key}'")]
    Locked {
        /// The key that was being written.
        key: String,
    },

    /// The key is empty or has an empty segment.
    #[error("invalid settings key '{0}'")]
    InvalidKey(String),

    /// A dotted key passes through a value that is not a table.
    #[error("'{key}' is not a table")]
    NotATable {
        /// The prefix that holds a non-table value.
        key: String,
    },

    /// No value is set for the key in any tier.
    #[error("no setting named '{0}'")]
    Missing(String),

    /// A value could not be converted to or from JSON.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}
