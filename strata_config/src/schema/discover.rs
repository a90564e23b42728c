//! Discovery of schema definitions from a directory of documents.
//!
//! Each definition document (TOML or JSON) declares one or more schemas
//! under a `schema` array: group, name, optional target and flag defaults,
//! and a `fields` table. A field with no `default` entry is required.
//!
//! ```toml
//! [[schema]]
//! name = "sgd"
//! group = "optimizer"
//! target = "optim.SGD"
//!
//! [schema.fields.lr]
//! kind = "float"
//! default = 0.1
//!
//! [schema.fields.momentum]
//! kind = "float"
//! ```
//!
//! Discovery is idempotent: re-loading a directory that declares already
//! registered, identical schemas is a no-op.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{StrataError, StrataResult};
use crate::file::load_document;

use super::{FieldDef, FieldKind, RegistryBuilder, SchemaType};

#[derive(Debug, Deserialize)]
struct DefinitionDoc {
    #[serde(default)]
    schema: Vec<SchemaDecl>,
}

#[derive(Debug, Deserialize)]
struct SchemaDecl {
    name: String,
    group: String,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    partial: Option<bool>,
    #[serde(default)]
    recursive: Option<bool>,
    #[serde(default)]
    fields: BTreeMap<String, FieldDecl>,
}

#[derive(Debug, Deserialize)]
struct FieldDecl {
    kind: String,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    default: Option<Value>,
}

fn field_kind(path: &Utf8Path, field: &str, decl: &FieldDecl) -> Result<FieldKind, StrataError> {
    match decl.kind.as_str() {
        "bool" => Ok(FieldKind::Bool),
        "int" => Ok(FieldKind::Int),
        "float" => Ok(FieldKind::Float),
        "str" => Ok(FieldKind::Str),
        "list" => Ok(FieldKind::List),
        "any" => Ok(FieldKind::Any),
        "config" => decl
            .group
            .clone()
            .map(|group| FieldKind::Config { group })
            .ok_or_else(|| {
                StrataError::file(
                    path,
                    format!("field '{field}' of kind 'config' must declare a group"),
                )
            }),
        other => Err(StrataError::file(
            path,
            format!("unknown kind '{other}' for field '{field}'"),
        )),
    }
}

fn schema_from_decl(path: &Utf8Path, decl: SchemaDecl) -> Result<SchemaType, StrataError> {
    let mut schema = SchemaType::new(&decl.group, &decl.name);
    if let Some(target) = &decl.target {
        schema = schema.with_target(target);
    }
    if let Some(partial) = decl.partial {
        schema = schema.with_partial(partial);
    }
    if let Some(recursive) = decl.recursive {
        schema = schema.with_recursive(recursive);
    }
    for (field, field_decl) in &decl.fields {
        let kind = field_kind(path, field, field_decl)?;
        let mut def = FieldDef::new(kind);
        if let Some(default) = &field_decl.default {
            def = def.with_default(default.clone());
        }
        schema = schema.with_field(field, def);
    }
    Ok(schema)
}

/// Load every schema definition document within `dir` into `builder`.
///
/// Files with a `.toml` or `.json` extension are loaded in name order so
/// discovery is deterministic. Returns the number of declarations
/// processed; re-registering an identical declaration is a no-op.
///
/// # Errors
///
/// Returns a [`StrataError::File`] when a document cannot be read or its
/// declarations are malformed, or a registration error when a declaration
/// collides with a different, already registered schema.
pub fn discover(builder: &mut RegistryBuilder, dir: &Utf8Path) -> StrataResult<usize> {
    let entries = std::fs::read_dir(dir.as_std_path())
        .map_err(|e| StrataError::file_shared(dir, e))?;
    let mut paths: Vec<Utf8PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StrataError::file_shared(dir, e))?;
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
            continue;
        };
        let ext = path.extension().map(str::to_ascii_lowercase);
        if matches!(ext.as_deref(), Some("toml" | "json")) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut registered = 0;
    for path in &paths {
        let value = load_document(path)?;
        let doc: DefinitionDoc = serde_json::from_value(value)
            .map_err(|e| StrataError::file_shared(path, e))?;
        for decl in doc.schema {
            let schema = schema_from_decl(path, decl)
                .map_err(std::sync::Arc::new)?;
            tracing::debug!(path = %path, group = %schema.group(), name = %schema.name(), "discovered schema");
            builder.register(schema)?;
            registered += 1;
        }
    }
    Ok(registered)
}
