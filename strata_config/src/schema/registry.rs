//! Registry indexing schema types by dotted group path and name.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::error::{StrataError, StrataResult};
use crate::result_ext::StrataResultExt;

use super::SchemaType;

#[derive(Debug, Default)]
struct GroupNode {
    schemas: BTreeMap<String, Arc<SchemaType>>,
    children: BTreeMap<String, GroupNode>,
}

fn segments(group: &str) -> impl Iterator<Item = &str> {
    group.split('.').filter(|segment| !segment.is_empty())
}

/// Builder accumulating schema registrations before the one-time build.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    root: GroupNode,
    count: usize,
}

impl RegistryBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema under its declared group path and name.
    ///
    /// Nested path segments are created lazily. Registering the identical
    /// definition twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a registration error when the same group and name already
    /// map to a *different* schema definition.
    pub fn register(&mut self, schema: SchemaType) -> StrataResult<()> {
        let group = schema.group().to_owned();
        let name = schema.name().to_owned();
        let mut node = &mut self.root;
        for segment in segments(&group) {
            node = node.children.entry(segment.to_owned()).or_default();
        }
        if let Some(existing) = node.schemas.get(&name) {
            if **existing == schema {
                return Ok(());
            }
            return Err(StrataError::registration(&group, &name)).into_shared();
        }
        tracing::debug!(group = %group, name = %name, "registering schema");
        node.schemas.insert(name, Arc::new(schema));
        self.count += 1;
        Ok(())
    }

    /// Number of schemas registered so far.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Whether no schema has been registered yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Finish registration, producing an immutable registry.
    #[must_use]
    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry { root: self.root }
    }
}

/// Immutable index of schema types, keyed by group path then name.
///
/// Built once per process via [`RegistryBuilder`] (or [`SharedRegistry`]
/// when several entry points share one registry) and read-only thereafter,
/// so concurrent lookups need no locking.
#[derive(Debug)]
pub struct SchemaRegistry {
    root: GroupNode,
}

impl SchemaRegistry {
    fn group_node(&self, group: &str) -> StrataResult<&GroupNode> {
        let mut node = &self.root;
        for segment in segments(group) {
            node = node.children.get(segment).ok_or_else(|| {
                Arc::new(StrataError::lookup(group, ""))
            })?;
        }
        Ok(node)
    }

    /// Look up a schema by group path and name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error when any path segment or the name is absent.
    pub fn lookup(&self, group: &str, name: &str) -> StrataResult<Arc<SchemaType>> {
        let node = self
            .group_node(group)
            .map_err(|_| Arc::new(StrataError::lookup(group, name)))?;
        node.schemas
            .get(name)
            .cloned()
            .ok_or_else(|| Arc::new(StrataError::lookup(group, name)))
    }

    /// Return the name-to-schema map registered under `group`.
    ///
    /// # Errors
    ///
    /// Returns a lookup error when any path segment is absent.
    pub fn group(&self, group: &str) -> StrataResult<&BTreeMap<String, Arc<SchemaType>>> {
        self.group_node(group).map(|node| &node.schemas)
    }
}

/// Build-once guard for a process-wide shared registry.
///
/// The host owns the static; the library never hides a global. The first
/// caller's init closure builds the registry; concurrent callers block on
/// the build guard and then observe the cached instance, so the scan runs
/// exactly once.
///
/// # Examples
///
/// ```rust
/// use strata_config::{RegistryBuilder, SchemaType, SharedRegistry};
///
/// static REGISTRY: SharedRegistry = SharedRegistry::new();
///
/// # fn main() -> strata_config::StrataResult<()> {
/// let registry = REGISTRY.get_or_build(|| {
///     let mut builder = RegistryBuilder::new();
///     builder.register(SchemaType::new("optimizer", "sgd"))?;
///     Ok(builder.build())
/// })?;
/// assert!(registry.lookup("optimizer", "sgd").is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SharedRegistry {
    cell: OnceLock<Arc<SchemaRegistry>>,
    build: Mutex<()>,
}

impl SharedRegistry {
    /// Create an empty, unbuilt guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            build: Mutex::new(()),
        }
    }

    /// Return the cached registry, building it with `init` on first use.
    ///
    /// # Errors
    ///
    /// Propagates the init closure's error; a failed build leaves the guard
    /// unbuilt so a later caller may retry.
    pub fn get_or_build<F>(&self, init: F) -> StrataResult<Arc<SchemaRegistry>>
    where
        F: FnOnce() -> StrataResult<SchemaRegistry>,
    {
        if let Some(registry) = self.cell.get() {
            return Ok(Arc::clone(registry));
        }
        let _guard = self.build.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(registry) = self.cell.get() {
            return Ok(Arc::clone(registry));
        }
        let built = Arc::new(init()?);
        Ok(Arc::clone(self.cell.get_or_init(|| built)))
    }

    /// Return the cached registry without building.
    #[must_use]
    pub fn get(&self) -> Option<Arc<SchemaRegistry>> {
        self.cell.get().map(Arc::clone)
    }
}
