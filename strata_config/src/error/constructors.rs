//! Constructor helpers for `StrataError`.

use std::sync::Arc;

use camino::Utf8Path;

use super::types::{BoxedError, StrataError};

impl StrataError {
    /// Build a registration collision error.
    #[must_use]
    pub fn registration(group: &str, name: &str) -> Self {
        Self::Registration {
            group: group.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Build a lookup failure for an unknown group/name address.
    #[must_use]
    pub fn lookup(group: &str, name: &str) -> Self {
        Self::Lookup {
            group: group.to_owned(),
            name: name.to_owned(),
        }
    }

    /// Build a composition error for `key` as seen from `source_name`.
    ///
    /// `source_name` names where the entry came from, e.g. `override` or
    /// `document 'train.toml'`, so the failing source is identifiable from
    /// the message alone.
    #[must_use]
    pub fn composition(key: &str, source_name: &str, detail: &str) -> Self {
        Self::Composition {
            key: key.to_owned(),
            source_name: source_name.to_owned(),
            message: format!("cannot compose '{key}' from {source_name}: {detail}"),
        }
    }

    /// Build an instantiation error for a target that could not be resolved.
    #[must_use]
    pub fn cannot_locate_target(
        target: &str,
        full_key: Option<&str>,
        source: BoxedError,
    ) -> Self {
        let mut message = format!("cannot locate target '{target}': {source}");
        if let Some(key) = full_key {
            message.push_str(&format!("\nfull_key: {key}"));
        }
        Self::Instantiation {
            target: Some(target.to_owned()),
            full_key: full_key.map(str::to_owned),
            message,
            source: Some(source),
        }
    }

    /// Build an instantiation error for a failed target call.
    #[must_use]
    pub fn call_failure(target: &str, full_key: Option<&str>, source: BoxedError) -> Self {
        let mut message = format!("error in call to target '{target}': {source}");
        if let Some(key) = full_key {
            message.push_str(&format!("\nfull_key: {key}"));
        }
        Self::Instantiation {
            target: Some(target.to_owned()),
            full_key: full_key.map(str::to_owned),
            message,
            source: Some(source),
        }
    }

    /// Build an internal instantiation defect with no originating cause.
    #[must_use]
    pub fn instantiation_defect(message: &str, full_key: Option<&str>) -> Self {
        let mut text = message.to_owned();
        if let Some(key) = full_key {
            text.push_str(&format!("\nfull_key: {key}"));
        }
        Self::Instantiation {
            target: None,
            full_key: full_key.map(str::to_owned),
            message: text,
            source: None,
        }
    }

    /// Build a document error for `path` from an underlying failure.
    #[must_use]
    pub fn file(path: &Utf8Path, source: impl Into<BoxedError>) -> Self {
        Self::File {
            path: path.to_owned(),
            source: source.into(),
        }
    }

    /// Build a document error already wrapped for the shared result alias.
    #[must_use]
    pub fn file_shared(path: &Utf8Path, source: impl Into<BoxedError>) -> Arc<Self> {
        Arc::new(Self::file(path, source))
    }
}
