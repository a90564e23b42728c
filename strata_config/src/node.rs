//! The declarative configuration tree.
//!
//! A [`ConfigNode`] is polymorphic over records, lists and scalars. Records
//! carry their construction metadata structurally: a [`RecordKind`] tags a
//! record as plain or target-bearing, and [`ControlFlags`] hold the two
//! inherited instantiation flags. In serialised form the metadata travels as
//! the control keys `group__`, `name__`, `target__`, `partial__` and
//! `recursive__`; parsing lifts those keys out of the field map so traversal
//! never has to re-check an exclusion set.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::StrataError;

/// Serialised spelling of the MISSING sentinel.
pub const MISSING_TOKEN: &str = "???";

/// Control key carrying a record's group identity.
pub const KEY_GROUP: &str = "group__";
/// Control key carrying a record's schema name.
pub const KEY_NAME: &str = "name__";
/// Control key naming the construction target.
pub const KEY_TARGET: &str = "target__";
/// Control key overriding the inherited `partial` flag.
pub const KEY_PARTIAL: &str = "partial__";
/// Control key overriding the inherited `recursive` flag.
pub const KEY_RECURSIVE: &str = "recursive__";

/// All control keys, in serialised order.
pub const CONTROL_KEYS: [&str; 5] = [KEY_GROUP, KEY_NAME, KEY_TARGET, KEY_PARTIAL, KEY_RECURSIVE];

/// A leaf value in the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Explicit null.
    Null,
    /// The MISSING sentinel: an intentionally unset, required value.
    Missing,
    /// Boolean value.
    Bool(bool),
    /// Signed integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
}

impl Scalar {
    /// Parse a JSON scalar into a `Scalar`, mapping `"???"` to MISSING.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Null),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            Value::String(s) if s == MISSING_TOKEN => Some(Self::Missing),
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Serialise back to a JSON scalar.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Missing => Value::String(MISSING_TOKEN.to_owned()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number),
            Self::Str(s) => Value::String(s.clone()),
        }
    }

    /// Whether this scalar is the MISSING sentinel.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Distinguishes records that construct something from records that are
/// plain parameter containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    /// Not constructible; instantiation returns a control-free copy.
    Plain,
    /// Constructible; instantiation resolves and calls the named target.
    Target {
        /// Dotted path naming the callable to construct.
        target: String,
    },
}

/// The two inherited instantiation flags.
///
/// `None` means "inherit from the parent"; `Some` overrides the inherited
/// value for this record and its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags {
    /// Defer the target call, returning a bound callable instead.
    pub partial: Option<bool>,
    /// Recursively instantiate children before the call.
    pub recursive: Option<bool>,
}

/// Group/name identity of a record that originated from a registered schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Dotted group path the schema was registered under.
    pub group: String,
    /// Schema name within the group.
    pub name: String,
}

/// A record node: an ordered mapping of field names to child nodes plus
/// structural metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    kind: Option<String>,
    flags: ControlFlags,
    identity: Option<Identity>,
    fields: BTreeMap<String, ConfigNode>,
}

impl Record {
    /// Create an empty plain record.
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    /// Create an empty target record for `target`.
    #[must_use]
    pub fn target(target: &str) -> Self {
        Self {
            kind: Some(target.to_owned()),
            ..Self::default()
        }
    }

    /// The record kind: plain or target-bearing.
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind.as_ref().map_or(RecordKind::Plain, |t| RecordKind::Target { target: t.clone() })
    }

    /// The target string, when this is a target record.
    #[must_use]
    pub fn target_path(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Turn this record into a target record for `target`.
    pub fn set_target(&mut self, target: &str) {
        self.kind = Some(target.to_owned());
    }

    /// The record's control flags.
    #[must_use]
    pub const fn flags(&self) -> ControlFlags {
        self.flags
    }

    /// Set the control flags.
    pub const fn set_flags(&mut self, flags: ControlFlags) {
        self.flags = flags;
    }

    /// The record's group/name identity, when it carries one.
    #[must_use]
    pub const fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Set the group/name identity.
    pub fn set_identity(&mut self, group: &str, name: &str) {
        self.identity = Some(Identity {
            group: group.to_owned(),
            name: name.to_owned(),
        });
    }

    /// The field map.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, ConfigNode> {
        &self.fields
    }

    /// Look up a field by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ConfigNode> {
        self.fields.get(name)
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, name: &str, node: ConfigNode) {
        self.fields.insert(name.to_owned(), node);
    }

    /// Parse a JSON object into a record, lifting control keys into
    /// structural metadata.
    ///
    /// # Errors
    ///
    /// Returns a composition error when a control key has the wrong type,
    /// e.g. a non-string `target__` or a non-boolean `partial__`.
    pub fn from_object(map: &Map<String, Value>) -> Result<Self, StrataError> {
        let mut record = Self::default();
        for (key, value) in map {
            match key.as_str() {
                KEY_TARGET => record.kind = Some(expect_str(key, value)?),
                KEY_GROUP | KEY_NAME => {
                    let text = expect_str(key, value)?;
                    let identity = record.identity.get_or_insert(Identity {
                        group: String::new(),
                        name: String::new(),
                    });
                    if key == KEY_GROUP {
                        identity.group = text;
                    } else {
                        identity.name = text;
                    }
                }
                KEY_PARTIAL => record.flags.partial = Some(expect_bool(key, value)?),
                KEY_RECURSIVE => record.flags.recursive = Some(expect_bool(key, value)?),
                _ => {
                    record
                        .fields
                        .insert(key.clone(), ConfigNode::from_value(value)?);
                }
            }
        }
        Ok(record)
    }

    /// Serialise back to a JSON object, re-emitting control keys.
    #[must_use]
    pub fn to_object(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(identity) = &self.identity {
            map.insert(KEY_GROUP.to_owned(), Value::String(identity.group.clone()));
            map.insert(KEY_NAME.to_owned(), Value::String(identity.name.clone()));
        }
        if let Some(target) = &self.kind {
            map.insert(KEY_TARGET.to_owned(), Value::String(target.clone()));
        }
        if let Some(partial) = self.flags.partial {
            map.insert(KEY_PARTIAL.to_owned(), Value::Bool(partial));
        }
        if let Some(recursive) = self.flags.recursive {
            map.insert(KEY_RECURSIVE.to_owned(), Value::Bool(recursive));
        }
        for (name, node) in &self.fields {
            map.insert(name.clone(), node.to_value());
        }
        map
    }
}

/// A node in the declarative configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    /// A leaf value.
    Scalar(Scalar),
    /// An ordered sequence of nodes.
    List(Vec<ConfigNode>),
    /// A record of named fields with construction metadata.
    Record(Record),
}

impl ConfigNode {
    /// Parse a JSON value into a configuration node.
    ///
    /// # Errors
    ///
    /// Returns a composition error when a record's control keys carry the
    /// wrong type.
    pub fn from_value(value: &Value) -> Result<Self, StrataError> {
        match value {
            Value::Array(items) => {
                let nodes = items
                    .iter()
                    .map(Self::from_value)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::List(nodes))
            }
            Value::Object(map) => Ok(Self::Record(Record::from_object(map)?)),
            other => Scalar::from_value(other).map(Self::Scalar).ok_or_else(|| {
                StrataError::composition("", "value tree", "unsupported scalar value")
            }),
        }
    }

    /// Serialise back to a JSON value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(scalar) => scalar.to_value(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_value).collect()),
            Self::Record(record) => Value::Object(record.to_object()),
        }
    }

    /// Whether this node is the MISSING sentinel.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Scalar(Scalar::Missing))
    }
}

fn expect_str(key: &str, value: &Value) -> Result<String, StrataError> {
    value.as_str().map(str::to_owned).ok_or_else(|| {
        StrataError::composition(key, "value tree", "control key must be a string")
    })
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, StrataError> {
    value.as_bool().ok_or_else(|| {
        StrataError::composition(key, "value tree", "control key must be a boolean")
    })
}
