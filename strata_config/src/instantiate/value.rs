//! Live values produced by instantiation.
//!
//! Walking a configuration tree yields a [`Built`] value: scalars and plain
//! records pass through as data, target records become opaque [`Object`]s
//! (or [`Partial`]s when deferred), and `recursive = false` forwards
//! children as raw [`crate::ConfigNode`] values untouched.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{StrataError, StrataResult};
use crate::node::{ConfigNode, Scalar};

/// Boxed error returned by target constructors.
pub type TargetError = Box<dyn std::error::Error + Send + Sync>;

/// A callable that constructs a live value from resolved arguments.
pub type TargetFn = Arc<dyn Fn(CallArgs) -> Result<Built, TargetError> + Send + Sync>;

/// Positional and keyword arguments collected for a target call.
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    /// Positional arguments, in order.
    pub positional: Vec<Built>,
    /// Keyword arguments built from the record's fields.
    pub keyword: BTreeMap<String, Built>,
}

impl CallArgs {
    /// Create an empty argument set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            positional: Vec::new(),
            keyword: BTreeMap::new(),
        }
    }

    /// Look up a keyword argument.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Built> {
        self.keyword.get(name)
    }

    /// Look up a keyword argument, erroring when absent.
    ///
    /// Intended for use inside target constructors, where a missing
    /// argument is a call failure the engine reports against the target.
    ///
    /// # Errors
    ///
    /// Returns a [`TargetError`] naming the missing argument.
    pub fn require(&self, name: &str) -> Result<&Built, TargetError> {
        self.keyword
            .get(name)
            .ok_or_else(|| format!("missing keyword argument '{name}'").into())
    }
}

/// An opaque constructed object, type-erased behind [`Any`].
#[derive(Clone)]
pub struct Object {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Object {
    /// Wrap a constructed value.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// The Rust type name of the wrapped value.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value as `T`, when the types match.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Object({})", self.type_name)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// A deferred target call: the resolved callable bound to its arguments,
/// returned instead of the call's result when `partial` is in force.
#[derive(Clone)]
pub struct Partial {
    name: String,
    full_key: Option<String>,
    target: TargetFn,
    bound: CallArgs,
}

impl Partial {
    pub(crate) fn new(
        name: &str,
        full_key: Option<&str>,
        target: TargetFn,
        bound: CallArgs,
    ) -> Self {
        Self {
            name: name.to_owned(),
            full_key: full_key.map(str::to_owned),
            target,
            bound,
        }
    }

    /// The qualified name of the deferred target.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The arguments the call is bound to.
    #[must_use]
    pub const fn bound(&self) -> &CallArgs {
        &self.bound
    }

    /// Invoke the deferred call with no further arguments.
    ///
    /// # Errors
    ///
    /// Returns an instantiation error when the target call fails.
    pub fn invoke(&self) -> StrataResult<Built> {
        self.call(CallArgs::new())
    }

    /// Invoke the deferred call, merging `extra` over the bound arguments.
    ///
    /// Extra positional arguments append after the bound ones; extra
    /// keyword arguments win on collision.
    ///
    /// # Errors
    ///
    /// Returns an instantiation error when the target call fails.
    pub fn call(&self, extra: CallArgs) -> StrataResult<Built> {
        let mut merged = self.bound.clone();
        merged.positional.extend(extra.positional);
        for (name, value) in extra.keyword {
            merged.keyword.insert(name, value);
        }
        (self.target)(merged).map_err(|e| {
            Arc::new(StrataError::call_failure(
                &self.name,
                self.full_key.as_deref(),
                e,
            ))
        })
    }
}

impl fmt::Debug for Partial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partial")
            .field("name", &self.name)
            .field("full_key", &self.full_key)
            .finish_non_exhaustive()
    }
}

/// A live value produced by instantiating a configuration node.
#[derive(Clone, Debug)]
pub enum Built {
    /// Explicit null, passed through.
    Null,
    /// The MISSING sentinel, passed through.
    Missing,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar.
    Str(String),
    /// An instantiated list, order-preserving.
    List(Vec<Built>),
    /// An instantiated plain record, control metadata stripped.
    Record(BTreeMap<String, Built>),
    /// An opaque object constructed by a target call.
    Object(Object),
    /// A deferred target call.
    Deferred(Partial),
    /// An un-instantiated node forwarded under `recursive = false`.
    Config(ConfigNode),
}

impl Built {
    /// Convert a scalar node into its live counterpart.
    #[must_use]
    pub fn from_scalar(scalar: &Scalar) -> Self {
        match scalar {
            Scalar::Null => Self::Null,
            Scalar::Missing => Self::Missing,
            Scalar::Bool(b) => Self::Bool(*b),
            Scalar::Int(i) => Self::Int(*i),
            Scalar::Float(f) => Self::Float(*f),
            Scalar::Str(s) => Self::Str(s.clone()),
        }
    }

    /// Forward a node without instantiating it.
    ///
    /// Scalars convert directly; lists and records stay wrapped as raw
    /// configuration.
    #[must_use]
    pub fn raw(node: &ConfigNode) -> Self {
        match node {
            ConfigNode::Scalar(scalar) => Self::from_scalar(scalar),
            other => Self::Config(other.clone()),
        }
    }

    /// The boolean value, when this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer value, when this is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float value, when this is a float.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string value, when this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The list elements, when this is a list.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Built]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// The field map, when this is a plain record.
    #[must_use]
    pub const fn as_record(&self) -> Option<&BTreeMap<String, Built>> {
        match self {
            Self::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// The wrapped object, when this is one.
    #[must_use]
    pub const fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Borrow a constructed object as `T`, when this is an object of `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_object().and_then(Object::downcast_ref)
    }

    /// The deferred call, when this is one.
    #[must_use]
    pub const fn as_deferred(&self) -> Option<&Partial> {
        match self {
            Self::Deferred(partial) => Some(partial),
            _ => None,
        }
    }
}

impl PartialEq for Built {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) | (Self::Missing, Self::Missing) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Config(a), Self::Config(b)) => a == b,
            // Deferred calls have no useful equality.
            _ => false,
        }
    }
}
