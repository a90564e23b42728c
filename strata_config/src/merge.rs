//! Deep-merge mechanics for dict-shaped configuration layers.
//!
//! Layers are [`serde_json::Value`] blobs so composition can combine
//! defaults, document entries and overrides deterministically before any
//! schema validation runs. Objects merge recursively with later-source
//! precedence; arrays and scalars replace wholesale.

use std::borrow::Cow;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

use crate::node::KEY_NAME;

/// Provenance of a merge layer, lowest to highest precedence.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum MergeProvenance {
    /// Default values declared on the entry-point schema.
    Defaults,
    /// Values resolved from the external document.
    Document,
    /// Values resolved from command-line overrides.
    Overrides,
}

/// A configuration layer tagged with its provenance.
#[derive(Clone, Debug)]
pub struct MergeLayer<'a> {
    provenance: MergeProvenance,
    value: Cow<'a, Value>,
    path: Option<Utf8PathBuf>,
}

impl<'a> MergeLayer<'a> {
    /// Construct a layer of schema defaults.
    #[must_use]
    pub const fn defaults(value: Cow<'a, Value>) -> Self {
        Self {
            provenance: MergeProvenance::Defaults,
            value,
            path: None,
        }
    }

    /// Construct a layer resolved from a document, recording its path.
    #[must_use]
    pub const fn document(value: Cow<'a, Value>, path: Option<Utf8PathBuf>) -> Self {
        Self {
            provenance: MergeProvenance::Document,
            value,
            path,
        }
    }

    /// Construct a layer resolved from command-line overrides.
    #[must_use]
    pub const fn overrides(value: Cow<'a, Value>) -> Self {
        Self {
            provenance: MergeProvenance::Overrides,
            value,
            path: None,
        }
    }

    /// The layer's provenance.
    #[must_use]
    pub const fn provenance(&self) -> MergeProvenance {
        self.provenance
    }

    /// The source path, when the layer came from a document.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Consume the layer, returning its value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.value.into_owned()
    }
}

/// Overlay `layer` onto `target`, updating `target` in place.
///
/// Objects merge recursively: keys are added or overwritten, and nested
/// objects are overlaid. Arrays and scalars replace `target` wholesale.
/// Merging an object into a non-object target reinitialises the target to
/// an empty object first.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use strata_config::merge_value;
///
/// let mut acc = json!({"optimizer": {"lr": 0.1}});
/// merge_value(&mut acc, json!({"optimizer": {"momentum": 0.9}, "seed": 7}));
/// assert_eq!(
///     acc,
///     json!({"optimizer": {"lr": 0.1, "momentum": 0.9}, "seed": 7})
/// );
///
/// // Arrays replace existing values wholesale.
/// merge_value(&mut acc, json!({"optimizer": [1, 2]}));
/// assert_eq!(acc["optimizer"], json!([1, 2]));
/// ```
pub fn merge_value(target: &mut Value, layer: Value) {
    match layer {
        Value::Object(map) => merge_object(target, map),
        _ => *target = layer,
    }
}

fn merge_object(target: &mut Value, map: Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }

    // Records carrying different schema identities never merge field-wise:
    // switching a placed fragment for another must not leave the old
    // fragment's fields behind.
    if differing_identity(target, &map) {
        *target = Value::Object(map);
        return;
    }

    let Some(target_map) = target.as_object_mut() else {
        return;
    };

    for (key, value) in map {
        match target_map.get_mut(&key) {
            Some(existing) => merge_value(existing, value),
            None => {
                target_map.insert(key, value);
            }
        }
    }
}

fn differing_identity(target: &Value, map: &Map<String, Value>) -> bool {
    let incoming = map.get(KEY_NAME).and_then(Value::as_str);
    let existing = target.get(KEY_NAME).and_then(Value::as_str);
    matches!((incoming, existing), (Some(a), Some(b)) if a != b)
}

/// Merge an ordered sequence of layers, lowest precedence first.
#[must_use]
pub fn merge_layers<'a, I>(layers: I) -> Value
where
    I: IntoIterator<Item = MergeLayer<'a>>,
{
    let mut merged = Value::Object(Map::new());
    for layer in layers {
        tracing::debug!(provenance = ?layer.provenance(), "merging configuration layer");
        merge_value(&mut merged, layer.into_value());
    }
    merged
}
