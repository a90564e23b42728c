//! The composition engine: defaults, document and overrides to one record.
//!
//! Composition merges three ordered sources, lowest to highest precedence:
//! the entry-point schema's compiled-in defaults, the external document's
//! `entrypoint` section, and flat dotted `key=value` overrides. The merged
//! tree is validated and constructed through the schema layer, so every
//! required-field and declared-kind failure surfaces here, before any
//! object is built.

mod keys;
mod overrides;

pub use overrides::{Override, parse_overrides, parse_scalar};

use std::borrow::Cow;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

use crate::error::{StrataError, StrataResult};
use crate::file::{find_document, load_document};
use crate::merge::{MergeLayer, merge_layers, merge_value};
use crate::node::Record;
use crate::schema::{SchemaRegistry, SchemaType};

use keys::resolve_entries;

/// Name of the document section holding entry-point values.
pub const ENTRYPOINT_SECTION: &str = "entrypoint";

/// Inputs for one composition run.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Directory searched when composing a document by name.
    pub document_dir: Option<Utf8PathBuf>,
    /// Name of the document to compose, without extension.
    pub document_name: Option<String>,
    /// Explicit document path; takes precedence over name lookup.
    pub document_path: Option<Utf8PathBuf>,
    /// Raw `key=value` override strings.
    pub overrides: Vec<String>,
    /// Serialised config path; bypasses document composition entirely.
    pub bypass: Option<Utf8PathBuf>,
}

/// Compose the entry-point record from defaults, document and overrides.
///
/// # Errors
///
/// Returns a composition error for malformed overrides, unknown keys,
/// unresolved fragment names, missing or ambiguous documents, and any
/// required-field or declared-kind violation in the merged result.
pub fn compose(
    entry: &SchemaType,
    registry: &SchemaRegistry,
    options: &ComposeOptions,
) -> StrataResult<Record> {
    let parsed = parse_overrides(&options.overrides)?;
    let override_items: Vec<(String, Value)> =
        parsed.into_iter().map(|o| (o.key, o.value)).collect();

    if let Some(bypass) = &options.bypass {
        return compose_bypass(entry, registry, bypass, override_items);
    }

    let document = resolve_document(options)?;
    let document_layer = match &document {
        Some((value, path)) => {
            let items = entrypoint_items(value, path)?;
            resolve_entries(entry, registry, items, &format!("document '{path}'"))?
        }
        None => Value::Object(Map::new()),
    };
    let override_layer = resolve_entries(entry, registry, override_items, "override")?;

    tracing::debug!(
        document = document.as_ref().map(|(_, path)| path.as_str()),
        overrides = options.overrides.len(),
        "composing entry-point config"
    );

    // Expand fragment references in the defaults before merging so nested
    // document and override keys drill into the placed sub-records.
    let mut defaults = entry.default_tree();
    entry.expand_references(&mut defaults, registry)?;

    let mut merged = merge_layers([
        MergeLayer::defaults(Cow::Owned(defaults)),
        MergeLayer::document(
            Cow::Owned(document_layer),
            document.map(|(_, path)| path),
        ),
        MergeLayer::overrides(Cow::Owned(override_layer)),
    ]);
    entry.expand_references(&mut merged, registry)?;
    entry.construct(&merged, registry)
}

/// Bypass mode: load a serialised config wholesale and merge overrides in.
fn compose_bypass(
    entry: &SchemaType,
    registry: &SchemaRegistry,
    path: &Utf8Path,
    override_items: Vec<(String, Value)>,
) -> StrataResult<Record> {
    tracing::debug!(path = %path, "composing from serialised config");
    let mut tree = load_document(path)?;
    let override_layer = resolve_entries(entry, registry, override_items, "override")?;
    merge_value(&mut tree, override_layer);
    entry.expand_references(&mut tree, registry)?;
    entry.construct(&tree, registry)
}

fn entrypoint_items(value: &Value, path: &Utf8Path) -> StrataResult<Vec<(String, Value)>> {
    let section = value
        .get(ENTRYPOINT_SECTION)
        .and_then(Value::as_object)
        .ok_or_else(|| {
            std::sync::Arc::new(StrataError::composition(
                ENTRYPOINT_SECTION,
                &format!("document '{path}'"),
                "document has no 'entrypoint' section",
            ))
        })?;
    Ok(section
        .iter()
        .map(|(key, entry_value)| (key.clone(), entry_value.clone()))
        .collect())
}

fn resolve_document(options: &ComposeOptions) -> StrataResult<Option<(Value, Utf8PathBuf)>> {
    if let Some(path) = &options.document_path {
        return Ok(Some((load_document(path)?, path.clone())));
    }
    let Some(name) = &options.document_name else {
        return Ok(None);
    };
    let Some(dir) = &options.document_dir else {
        return Err(std::sync::Arc::new(StrataError::composition(
            name,
            "document lookup",
            "document name given without a document directory",
        )));
    };
    find_document(dir, name)?.map_or_else(
        || {
            Err(std::sync::Arc::new(StrataError::composition(
                name,
                "document lookup",
                &format!("no document named '{name}' in '{dir}'"),
            )))
        },
        |found| Ok(Some(found)),
    )
}
