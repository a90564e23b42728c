//! Schema types and the registry that indexes them.
//!
//! A [`SchemaType`] is the runtime definition of a record's fields: each
//! field declares a kind, an optional default and, for nested configs, the
//! group its values are registered under. Schemas declare their own group
//! path and name, and are indexed by the [`SchemaRegistry`] built once at
//! startup.
//!
//! A field with no default is required: its slot is seeded with the MISSING
//! sentinel and must be filled by the document or an override before
//! [`SchemaType::construct`] will accept the tree.

mod discover;
mod registry;

pub use discover::discover;
pub use registry::{RegistryBuilder, SchemaRegistry, SharedRegistry};

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{StrataError, StrataResult};
use crate::node::{
    ConfigNode, ControlFlags, KEY_GROUP, KEY_NAME, KEY_PARTIAL, KEY_RECURSIVE, KEY_TARGET,
    MISSING_TOKEN, Record, Scalar,
};
use crate::result_ext::StrataResultExt;

/// Declared kind of a schema field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Boolean parameter.
    Bool,
    /// Integer parameter.
    Int,
    /// Floating-point parameter; integer literals are accepted.
    Float,
    /// String parameter.
    Str,
    /// Ordered list parameter; elements are not typed further.
    List,
    /// A nested config addressed by the given registry group.
    ///
    /// Document entries and overrides may set such a field to the *name* of
    /// a schema registered under `group`; composition substitutes the
    /// resolved schema's default tree.
    Config {
        /// Dotted group path the nested config's schemas live under.
        group: String,
    },
    /// Accept any value unchanged.
    Any,
}

/// Definition of a single schema field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    kind: FieldKind,
    default: Option<Value>,
}

impl FieldDef {
    /// Create a field of the given kind with no default (required).
    #[must_use]
    pub const fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            default: None,
        }
    }

    /// Attach a default value.
    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// The declared kind.
    #[must_use]
    pub const fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// The declared default, when one exists.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether the field must be supplied by a document or override.
    #[must_use]
    pub fn required(&self) -> bool {
        match &self.default {
            None => true,
            Some(Value::String(s)) => s == MISSING_TOKEN,
            Some(_) => false,
        }
    }

    fn validate(
        &self,
        field: &str,
        node: &ConfigNode,
        registry: &SchemaRegistry,
    ) -> StrataResult<ConfigNode> {
        match (&self.kind, node) {
            (FieldKind::Any, _) => Ok(node.clone()),
            (FieldKind::Bool, ConfigNode::Scalar(Scalar::Bool(_)))
            | (FieldKind::Int, ConfigNode::Scalar(Scalar::Int(_)))
            | (FieldKind::Float, ConfigNode::Scalar(Scalar::Float(_)))
            | (FieldKind::Str, ConfigNode::Scalar(Scalar::Str(_)))
            | (FieldKind::List, ConfigNode::List(_)) => Ok(node.clone()),
            (FieldKind::Float, ConfigNode::Scalar(Scalar::Int(i))) => {
                let float = serde_json::Number::from(*i)
                    .as_f64()
                    .map_or(Scalar::Int(*i), Scalar::Float);
                Ok(ConfigNode::Scalar(float))
            }
            (FieldKind::Config { group }, ConfigNode::Record(record)) => {
                match record.identity() {
                    Some(identity) => {
                        let sub = registry.lookup(group, &identity.name)?;
                        let value = Value::Object(record.to_object());
                        sub.construct(&value, registry).map(ConfigNode::Record)
                    }
                    // An anonymous nested record: accept structurally.
                    None => Ok(node.clone()),
                }
            }
            (FieldKind::Config { group }, ConfigNode::Scalar(Scalar::Str(name))) => {
                let sub = registry.lookup(group, name)?;
                let value = sub.default_tree();
                sub.construct(&value, registry).map(ConfigNode::Record)
            }
            (kind, _) => Err(StrataError::composition(
                field,
                "merged config",
                &format!("value does not match the declared field kind {kind:?}"),
            ))
            .into_shared(),
        }
    }
}

/// Runtime definition of a record's fields and group/name identity.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaType {
    group: String,
    name: String,
    target: Option<String>,
    partial: Option<bool>,
    recursive: Option<bool>,
    fields: BTreeMap<String, FieldDef>,
}

impl SchemaType {
    /// Create a schema registered under `group` with the given `name`.
    #[must_use]
    pub fn new(group: &str, name: &str) -> Self {
        Self {
            group: group.to_owned(),
            name: name.to_owned(),
            target: None,
            partial: None,
            recursive: None,
            fields: BTreeMap::new(),
        }
    }

    /// Declare the construction target for records of this schema.
    #[must_use]
    pub fn with_target(mut self, target: &str) -> Self {
        self.target = Some(target.to_owned());
        self
    }

    /// Declare the default for the `partial` instantiation flag.
    #[must_use]
    pub const fn with_partial(mut self, partial: bool) -> Self {
        self.partial = Some(partial);
        self
    }

    /// Declare the default for the `recursive` instantiation flag.
    #[must_use]
    pub const fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = Some(recursive);
        self
    }

    /// Declare a field.
    #[must_use]
    pub fn with_field(mut self, name: &str, def: FieldDef) -> Self {
        self.fields.insert(name.to_owned(), def);
        self
    }

    /// The dotted group path this schema registers under.
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// The schema name within its group.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared construction target, when one exists.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Look up a field definition by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.get(name)
    }

    /// The declared fields.
    #[must_use]
    pub const fn fields(&self) -> &BTreeMap<String, FieldDef> {
        &self.fields
    }

    /// Serialise this schema's compiled-in defaults as a value tree.
    ///
    /// Control keys carry the schema identity and construction metadata.
    /// Required fields are seeded with the MISSING sentinel so an unfilled
    /// slot is still visible after all merges.
    #[must_use]
    pub fn default_tree(&self) -> Value {
        let mut map = Map::new();
        map.insert(KEY_GROUP.to_owned(), Value::String(self.group.clone()));
        map.insert(KEY_NAME.to_owned(), Value::String(self.name.clone()));
        if let Some(target) = &self.target {
            map.insert(KEY_TARGET.to_owned(), Value::String(target.clone()));
        }
        if let Some(partial) = self.partial {
            map.insert(KEY_PARTIAL.to_owned(), Value::Bool(partial));
        }
        if let Some(recursive) = self.recursive {
            map.insert(KEY_RECURSIVE.to_owned(), Value::Bool(recursive));
        }
        for (name, def) in &self.fields {
            let default = def
                .default
                .clone()
                .unwrap_or_else(|| Value::String(MISSING_TOKEN.to_owned()));
            map.insert(name.clone(), default);
        }
        Value::Object(map)
    }

    /// Expand unresolved schema references within a merged value tree.
    ///
    /// A `Config`-kind field whose value is still a plain name string is
    /// replaced with the referenced schema's default tree, recursively, so
    /// the final construction pass only ever sees fully-expanded records.
    ///
    /// # Errors
    ///
    /// Returns a lookup error when a referenced group/name is not
    /// registered.
    pub fn expand_references(
        &self,
        value: &mut Value,
        registry: &SchemaRegistry,
    ) -> StrataResult<()> {
        let Some(map) = value.as_object_mut() else {
            return Ok(());
        };
        for (name, def) in &self.fields {
            let FieldKind::Config { group } = &def.kind else {
                continue;
            };
            let Some(slot) = map.get_mut(name) else {
                continue;
            };
            if let Some(reference) = slot.as_str() {
                if reference == MISSING_TOKEN {
                    continue;
                }
                let sub = registry.lookup(group, reference)?;
                let mut expanded = sub.default_tree();
                sub.expand_references(&mut expanded, registry)?;
                *slot = expanded;
            } else if slot.is_object() {
                let sub_name = slot
                    .get(KEY_NAME)
                    .and_then(Value::as_str)
                    .map(str::to_owned);
                if let Some(sub_name) = sub_name {
                    let sub = registry.lookup(group, &sub_name)?;
                    sub.expand_references(slot, registry)?;
                }
            }
        }
        Ok(())
    }

    /// Construct and validate a record from a fully-merged value tree.
    ///
    /// This applies the schema layer's declared-kind checks and
    /// MISSING-field detection, so a record missing a required field fails
    /// here, at composition time, not at instantiation time.
    ///
    /// # Errors
    ///
    /// Returns a composition error for a non-object tree, an unknown field,
    /// a kind mismatch or an unfilled required field.
    pub fn construct(&self, value: &Value, registry: &SchemaRegistry) -> StrataResult<Record> {
        let Some(map) = value.as_object() else {
            return Err(StrataError::composition(
                &self.name,
                "merged config",
                "expected a record value",
            ))
            .into_shared();
        };
        let mut record = Record::from_object(map).into_shared()?;

        for name in record.fields().keys() {
            if !self.fields.contains_key(name) {
                return Err(StrataError::composition(
                    name,
                    "merged config",
                    &format!("unknown field for schema '{}'", self.name),
                ))
                .into_shared();
            }
        }

        let mut validated = Vec::with_capacity(self.fields.len());
        for (name, def) in &self.fields {
            let node = match record.get(name) {
                Some(node) => node.clone(),
                // An absent slot falls back to the declared default, so a
                // serialised config may omit defaulted fields.
                None if !def.required() => {
                    let default = def.default.clone().unwrap_or(Value::Null);
                    ConfigNode::from_value(&default).into_shared()?
                }
                None => {
                    return Err(StrataError::composition(
                        name,
                        "merged config",
                        &format!("missing required field for schema '{}'", self.name),
                    ))
                    .into_shared();
                }
            };
            if node.is_missing() {
                return Err(StrataError::composition(
                    name,
                    "merged config",
                    &format!("required field of schema '{}' is MISSING", self.name),
                ))
                .into_shared();
            }
            validated.push((name.clone(), def.validate(name, &node, registry)?));
        }
        for (name, node) in validated {
            record.insert(&name, node);
        }

        if record.identity().is_none() {
            record.set_identity(&self.group, &self.name);
        }
        if record.target_path().is_none() {
            if let Some(target) = &self.target {
                record.set_target(target);
            }
        }
        if record.flags() == ControlFlags::default() {
            record.set_flags(ControlFlags {
                partial: self.partial,
                recursive: self.recursive,
            });
        }
        Ok(record)
    }

    /// Assign a single field on an already-constructed record, re-validating
    /// the value through this schema.
    ///
    /// # Errors
    ///
    /// Returns a composition error when the field is unknown or the value
    /// does not match the declared kind.
    pub fn assign(
        &self,
        record: &mut Record,
        field: &str,
        node: &ConfigNode,
        registry: &SchemaRegistry,
    ) -> StrataResult<()> {
        let def = self.field(field).ok_or_else(|| {
            std::sync::Arc::new(StrataError::composition(
                field,
                "assignment",
                &format!("unknown field for schema '{}'", self.name),
            ))
        })?;
        let validated = def.validate(field, node, registry)?;
        record.insert(field, validated);
        Ok(())
    }
}
