//! Loading and serialising configuration documents.
//!
//! Documents parse by file extension: TOML is the default, JSON is
//! recognised by its extension. Parsed content is carried as
//! [`serde_json::Value`] so the merge engine can treat every source
//! uniformly.

use camino::{Utf8Path, Utf8PathBuf};
use figment::{
    Figment,
    providers::{Format, Toml},
};
use serde_json::Value;

use crate::error::{StrataError, StrataResult};
use crate::node::Record;

/// Extensions recognised as documents, in candidate order.
const DOCUMENT_EXTENSIONS: [&str; 2] = ["toml", "json"];

/// Load a document from `path`, parsing by extension.
///
/// # Errors
///
/// Returns a [`StrataError::File`] if reading or parsing fails.
pub fn load_document(path: &Utf8Path) -> StrataResult<Value> {
    let data = std::fs::read_to_string(path.as_std_path())
        .map_err(|e| StrataError::file_shared(path, e))?;
    parse_document(path, &data)
}

/// Parse document `data` according to the extension of `path`.
///
/// # Errors
///
/// Returns a [`StrataError::File`] if the content fails to parse.
pub fn parse_document(path: &Utf8Path, data: &str) -> StrataResult<Value> {
    let ext = path.extension().map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("json") => {
            serde_json::from_str(data).map_err(|e| StrataError::file_shared(path, e))
        }
        _ => {
            // Validate TOML first so parse failures are reported with this
            // file's context before Figment performs its own parse pass.
            toml::from_str::<toml::Value>(data).map_err(|e| StrataError::file_shared(path, e))?;
            Figment::from(Toml::string(data))
                .extract::<Value>()
                .map_err(|e| StrataError::file_shared(path, e))
        }
    }
}

/// Find and load the document called `name` within `dir`.
///
/// Candidates are `<name>.toml` and `<name>.json`. Returns `Ok(None)` when
/// neither exists.
///
/// # Errors
///
/// Returns a composition error when more than one candidate matches, or a
/// [`StrataError::File`] if the match fails to load.
pub fn find_document(dir: &Utf8Path, name: &str) -> StrataResult<Option<(Value, Utf8PathBuf)>> {
    let candidates: Vec<Utf8PathBuf> = DOCUMENT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{name}.{ext}")))
        .filter(|candidate| candidate.is_file())
        .collect();
    match candidates.as_slice() {
        [] => Ok(None),
        [only] => {
            tracing::debug!(path = %only, "loading document");
            Ok(Some((load_document(only)?, only.clone())))
        }
        many => Err(std::sync::Arc::new(StrataError::composition(
            name,
            "document lookup",
            &format!(
                "more than one matching document in '{dir}': {}",
                many.iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        ))),
    }
}

/// Serialise a composed record back to a TOML document string.
///
/// Used by the `--show` flow to display the fully merged configuration
/// instead of running it.
///
/// # Errors
///
/// Returns a composition error when the record contains values TOML cannot
/// represent (e.g. explicit nulls).
pub fn to_document(record: &Record) -> StrataResult<String> {
    let value = serde_json::Value::Object(record.to_object());
    toml::to_string_pretty(&value).map_err(|e| {
        std::sync::Arc::new(StrataError::composition(
            "",
            "show",
            &format!("cannot serialise composed config: {e}"),
        ))
    })
}
