//! Resolution of target strings to callables.
//!
//! Resolution is a capability: the engine only reaches the constructors its
//! resolver exposes. [`SymbolTable`] is the default implementation (a map
//! of dotted module paths to named constructors registered by the host at
//! startup) and doubles as the map-backed implementation for tests.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use super::value::{Built, CallArgs, TargetError, TargetFn};

/// Failure to resolve a target string to a callable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// No module is registered under the target's module path.
    #[error("unknown module '{module}'")]
    UnknownModule {
        /// The module path that failed to resolve.
        module: String,
    },
    /// The module exists but exposes no such attribute.
    #[error("module '{module}' has no attribute '{attr}'")]
    UnknownAttribute {
        /// The module path that resolved.
        module: String,
        /// The attribute that did not.
        attr: String,
    },
}

/// Capability-scoped resolution of target strings.
pub trait TargetResolver {
    /// Resolve a dotted target string to a callable.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] when the module path or attribute cannot
    /// be found.
    fn resolve(&self, target: &str) -> Result<TargetFn, ResolveError>;
}

/// Splits a target at its last separator into module path and attribute.
///
/// A target with no separator maps to the empty module path.
fn split_target(target: &str) -> (&str, &str) {
    target.rsplit_once('.').unwrap_or(("", target))
}

/// The default resolver: dotted module paths mapping attribute names to
/// constructor functions.
///
/// # Examples
///
/// ```rust
/// use strata_config::{Built, SymbolTable, TargetResolver};
///
/// let mut symbols = SymbolTable::new();
/// symbols.register("util.answer", |_args| Ok(Built::Int(42)));
///
/// let target = symbols.resolve("util.answer").expect("registered");
/// let result = target(strata_config::CallArgs::new()).expect("calls");
/// assert_eq!(result, Built::Int(42));
/// ```
#[derive(Clone, Default)]
pub struct SymbolTable {
    modules: BTreeMap<String, BTreeMap<String, TargetFn>>,
}

impl SymbolTable {
    /// Create an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// Register a constructor under a dotted target path.
    ///
    /// The path splits at its last separator into module path and
    /// attribute name, mirroring how resolution splits targets.
    pub fn register<F>(&mut self, target: &str, constructor: F) -> &mut Self
    where
        F: Fn(CallArgs) -> Result<Built, TargetError> + Send + Sync + 'static,
    {
        let (module, attr) = split_target(target);
        self.modules
            .entry(module.to_owned())
            .or_default()
            .insert(attr.to_owned(), std::sync::Arc::new(constructor));
        self
    }
}

impl TargetResolver for SymbolTable {
    fn resolve(&self, target: &str) -> Result<TargetFn, ResolveError> {
        let (module, attr) = split_target(target);
        let attrs = self
            .modules
            .get(module)
            .ok_or_else(|| ResolveError::UnknownModule {
                module: module.to_owned(),
            })?;
        attrs
            .get(attr)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownAttribute {
                module: module.to_owned(),
                attr: attr.to_owned(),
            })
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (module, attrs) in &self.modules {
            map.entry(&module, &attrs.keys().collect::<Vec<_>>());
        }
        map.finish()
    }
}
