//! Primary error enum for composition and instantiation flows.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Boxed error type used to chain originating failures.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias shared across the crate.
///
/// Errors are wrapped in [`Arc`] so composed results can be cloned into
/// multiple consumers without re-running the failing stage.
pub type StrataResult<T> = Result<T, Arc<StrataError>>;

/// Errors that can occur while registering schemas, composing configuration
/// or instantiating the resulting tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StrataError {
    /// The same group and name already map to a different schema definition.
    #[error("schema '{name}' is already registered under group '{group}' with a different definition")]
    Registration {
        /// Dotted group path of the rejected registration.
        group: String,
        /// Schema name of the rejected registration.
        name: String,
    },

    /// A group path or name could not be resolved in the registry.
    #[error("unknown config group/name '{group}/{name}'")]
    Lookup {
        /// Dotted group path that failed to resolve.
        group: String,
        /// Schema name that failed to resolve.
        name: String,
    },

    /// A document entry or command-line override could not be composed.
    #[error("{message}")]
    Composition {
        /// Offending key, when one is known.
        key: String,
        /// Name of the source the entry came from (override or document).
        source_name: String,
        /// Human-readable explanation, including the offending value.
        message: String,
    },

    /// A target could not be resolved or invoked.
    #[error("{message}")]
    Instantiation {
        /// Dotted target string, when the failure concerns one.
        target: Option<String>,
        /// Full dotted path of the failing node within the tree, when known.
        full_key: Option<String>,
        /// Human-readable explanation.
        message: String,
        /// Originating error, preserved as the cause.
        #[source]
        source: Option<BoxedError>,
    },

    /// A document could not be read or parsed.
    #[error("document error in '{path}': {source}")]
    File {
        /// Path that triggered the failure.
        path: Utf8PathBuf,
        /// Underlying read or parse error.
        #[source]
        source: BoxedError,
    },
}
