//! Command-line surface for entry points built on this crate.
//!
//! Parsing mechanics belong to `clap`; this module only defines the
//! contract: positional overrides plus the document, discovery and bypass
//! flags, mapped onto [`ComposeOptions`] for the composition engine.

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;

use crate::compose::ComposeOptions;

/// Command-line arguments understood by a strata entry point.
#[derive(Debug, Clone, Parser)]
#[command(name = "strata", version, about = "Compose declarative configuration and run an entry point")]
pub struct Cli {
    /// Any `key=value` arguments overriding config values; dots denote
    /// nesting.
    pub overrides: Vec<String>,

    /// Path to the entry-point document, absolute or relative to the
    /// entry point's base directory. A directory sets the search
    /// directory instead.
    #[arg(long, short = 'p')]
    pub document_path: Option<Utf8PathBuf>,

    /// Name of the entry-point document, without extension.
    #[arg(long, short = 'n')]
    pub document_name: Option<String>,

    /// Additional directory to scan for schema definitions.
    #[arg(long, short = 'd')]
    pub schema_dir: Option<Utf8PathBuf>,

    /// Display the composed config instead of running the entry point.
    #[arg(long, short = 's')]
    pub show: bool,

    /// Run with a serialised config, bypassing config composition.
    #[arg(long, short = 'c')]
    pub config: Option<Utf8PathBuf>,
}

impl Cli {
    /// Map the parsed arguments onto composition inputs.
    ///
    /// `base_dir` anchors relative document paths and is the default
    /// search directory for by-name lookup. A `--document-path` naming a
    /// file selects that document directly; naming a directory redirects
    /// the search there, mirroring how the path flag doubles as a
    /// directory override.
    #[must_use]
    pub fn compose_options(&self, base_dir: &Utf8Path) -> ComposeOptions {
        let mut document_dir = base_dir.to_owned();
        let mut document_path = None;
        if let Some(path) = &self.document_path {
            let resolved = if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            };
            if resolved.is_file() {
                document_path = Some(resolved);
            } else {
                document_dir = resolved;
            }
        }
        ComposeOptions {
            document_dir: Some(document_dir),
            document_name: self.document_name.clone(),
            document_path,
            overrides: self.overrides.clone(),
            bypass: self.config.clone(),
        }
    }
}
