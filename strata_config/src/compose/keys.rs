//! Per-key resolution shared by document entries and overrides.

use serde_json::{Map, Value};

use crate::error::{StrataError, StrataResult};
use crate::merge::merge_value;
use crate::result_ext::StrataResultExt;
use crate::schema::{FieldKind, SchemaRegistry, SchemaType};

/// Resolve one dotted entry against the entry-point schema.
///
/// The head segment must name a field on the schema. With no nested
/// remainder, a string value for a `Config`-kind field is treated as the
/// name of a pre-registered fragment and substituted with that schema's
/// default tree. A nested remainder nests the value as a chain of
/// single-key maps, so the deep merge drills into the already-placed
/// sub-record field by field.
pub(crate) fn resolve_entry(
    entry: &SchemaType,
    registry: &SchemaRegistry,
    key: &str,
    value: Value,
    source_name: &str,
) -> StrataResult<(String, Value)> {
    let mut parts = key.split('.');
    let head = parts.next().unwrap_or_default();
    let field = entry.field(head).ok_or_else(|| {
        std::sync::Arc::new(StrataError::composition(
            key,
            source_name,
            &format!("unknown key '{head}' for schema '{}'", entry.name()),
        ))
    })?;

    let nested: Vec<&str> = parts.collect();
    if nested.is_empty() {
        if let FieldKind::Config { group } = field.kind() {
            if let Some(name) = value.as_str() {
                let fragment = registry.lookup(group, name).map_err(|_| {
                    std::sync::Arc::new(StrataError::composition(
                        key,
                        source_name,
                        &format!("no config named '{name}' under group '{group}'"),
                    ))
                })?;
                return Ok((head.to_owned(), fragment.default_tree()));
            }
        }
        return Ok((head.to_owned(), value));
    }

    // Nested drill-down: wrap the value so the merge engine descends into
    // the sub-record's own field map, later sources winning leaf by leaf.
    let mut tree = value;
    for segment in nested.iter().rev() {
        if segment.is_empty() {
            return Err(StrataError::composition(
                key,
                source_name,
                "empty path segment",
            ))
            .into_shared();
        }
        let mut wrapper = Map::new();
        wrapper.insert((*segment).to_owned(), tree);
        tree = Value::Object(wrapper);
    }
    Ok((head.to_owned(), tree))
}

/// Resolve a batch of entries into one nested dict.
pub(crate) fn resolve_entries<I>(
    entry: &SchemaType,
    registry: &SchemaRegistry,
    items: I,
    source_name: &str,
) -> StrataResult<Value>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut resolved = Value::Object(Map::new());
    for (key, value) in items {
        let (head, tree) = resolve_entry(entry, registry, &key, value, source_name)?;
        let mut wrapper = Map::new();
        wrapper.insert(head, tree);
        merge_value(&mut resolved, Value::Object(wrapper));
    }
    Ok(resolved)
}
