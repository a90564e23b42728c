//! Declarative configuration composition and object-graph instantiation.
//!
//! This crate turns a hierarchical record of typed parameters into either a
//! fully merged, validated configuration tree, or, by walking that tree, a
//! graph of constructed objects, with no hand-written wiring code.
//!
//! Three pieces cooperate:
//!
//! - a [`SchemaRegistry`] indexing known configuration schemas by dotted
//!   group path and name, built once at startup;
//! - the composition engine ([`compose`]), which deep-merges schema
//!   defaults, an external document and flat `key=value` overrides into one
//!   validated [`Record`];
//! - the instantiation engine ([`instantiate`]), which resolves `target__`
//!   records to callables through a [`TargetResolver`] and invokes them
//!   with recursively-resolved arguments.
//!
//! ```rust
//! use strata_config::{
//!     Built, ComposeOptions, FieldDef, FieldKind, RegistryBuilder, SchemaType, SymbolTable,
//!     compose, instantiate,
//! };
//!
//! # fn main() -> strata_config::StrataResult<()> {
//! let optimizer = SchemaType::new("optimizer", "sgd")
//!     .with_target("optim.SGD")
//!     .with_field("lr", FieldDef::new(FieldKind::Float).with_default(0.1.into()));
//!
//! let mut builder = RegistryBuilder::new();
//! builder.register(optimizer.clone())?;
//! let registry = builder.build();
//!
//! let options = ComposeOptions {
//!     overrides: vec!["lr=0.01".into()],
//!     ..ComposeOptions::default()
//! };
//! let record = compose(&optimizer, &registry, &options)?;
//!
//! let mut symbols = SymbolTable::new();
//! symbols.register("optim.SGD", |args| {
//!     let lr = args.require("lr")?.as_f64().ok_or("lr must be a float")?;
//!     Ok(Built::Float(lr))
//! });
//! let built = instantiate(&record, &symbols)?;
//! assert_eq!(built, Built::Float(0.01));
//! # Ok(())
//! # }
//! ```

mod cli;
mod compose;
mod error;
mod file;
mod instantiate;
mod merge;
mod node;
mod result_ext;
mod schema;

pub use cli::Cli;
pub use compose::{
    ComposeOptions, ENTRYPOINT_SECTION, Override, compose, parse_overrides, parse_scalar,
};
pub use error::{StrataError, StrataResult};
pub use file::{find_document, load_document, parse_document, to_document};
pub use instantiate::{
    Built, CallArgs, Object, Partial, ResolveError, SymbolTable, TargetError, TargetFn,
    TargetResolver, instantiate, instantiate_with,
};
pub use merge::{MergeLayer, MergeProvenance, merge_layers, merge_value};
pub use node::{
    CONTROL_KEYS, ConfigNode, ControlFlags, Identity, KEY_GROUP, KEY_NAME, KEY_PARTIAL,
    KEY_RECURSIVE, KEY_TARGET, MISSING_TOKEN, Record, RecordKind, Scalar,
};
pub use result_ext::StrataResultExt;
pub use schema::{
    FieldDef, FieldKind, RegistryBuilder, SchemaRegistry, SchemaType, SharedRegistry, discover,
};
