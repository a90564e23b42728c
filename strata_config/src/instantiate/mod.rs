//! The instantiation engine: configuration trees to live object graphs.
//!
//! The walk is plain recursive descent. Two flags travel from parent to
//! child, each overridable by a record's own control metadata:
//!
//! - `recursive` (default `true`): when false, a record's children are
//!   passed to its target uninstantiated.
//! - `partial` (default `false`): when true, a target call is deferred and
//!   the engine returns a [`Partial`] bound to the resolved arguments
//!   instead of invoking it. `partial` does not propagate into individual
//!   list elements.
//!
//! Every failure carries the full dotted key of the failing node so a deep
//! tree failure is traceable from the message alone.

mod resolver;
mod value;

pub use resolver::{ResolveError, SymbolTable, TargetResolver};
pub use value::{Built, CallArgs, Object, Partial, TargetError, TargetFn};

use std::collections::BTreeMap;

use crate::error::{StrataError, StrataResult};
use crate::node::{ConfigNode, Record, RecordKind};
use crate::result_ext::StrataResultExt;

#[derive(Clone, Copy)]
struct Flags {
    recursive: bool,
    partial: bool,
}

impl Flags {
    fn for_record(record: &Record, inherited: Self) -> Self {
        Self {
            recursive: record.flags().recursive.unwrap_or(inherited.recursive),
            partial: record.flags().partial.unwrap_or(inherited.partial),
        }
    }
}

/// Instantiate a configuration record into a live value.
///
/// Equivalent to [`instantiate_with`] with no extra arguments.
///
/// # Errors
///
/// Returns an instantiation error when a target cannot be resolved or a
/// target call fails.
pub fn instantiate(root: &Record, resolver: &dyn TargetResolver) -> StrataResult<Built> {
    instantiate_with(root, resolver, Vec::new(), &BTreeMap::new())
}

/// Instantiate a configuration record, forwarding extra arguments.
///
/// `overrides` merge into the root's top-level fields before recursion
/// begins (override wins on collision); `args` are forwarded as positional
/// arguments to the root's target call. The root's own control flags seed
/// the inherited flags for the walk.
///
/// # Errors
///
/// Returns an instantiation error when a target cannot be resolved or a
/// target call fails.
pub fn instantiate_with(
    root: &Record,
    resolver: &dyn TargetResolver,
    args: Vec<Built>,
    overrides: &BTreeMap<String, ConfigNode>,
) -> StrataResult<Built> {
    // The walk never mutates the source tree; overrides land on a copy.
    let mut merged = root.clone();
    for (name, node) in overrides {
        merged.insert(name, node.clone());
    }
    let flags = Flags::for_record(
        &merged,
        Flags {
            recursive: true,
            partial: false,
        },
    );
    instantiate_record(&merged, resolver, flags, args, "")
}

fn child_key(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_owned()
    } else {
        format!("{parent}.{field}")
    }
}

fn instantiate_node(
    node: &ConfigNode,
    resolver: &dyn TargetResolver,
    inherited: Flags,
    full_key: &str,
) -> StrataResult<Built> {
    match node {
        ConfigNode::Scalar(scalar) => Ok(Built::from_scalar(scalar)),
        ConfigNode::List(items) => {
            let element_flags = Flags {
                recursive: inherited.recursive,
                partial: false,
            };
            let built = items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    instantiate_node(
                        item,
                        resolver,
                        element_flags,
                        &format!("{full_key}[{index}]"),
                    )
                })
                .collect::<StrataResult<Vec<_>>>()?;
            Ok(Built::List(built))
        }
        ConfigNode::Record(record) => {
            let flags = Flags::for_record(record, inherited);
            instantiate_record(record, resolver, flags, Vec::new(), full_key)
        }
    }
}

fn instantiate_field(
    node: &ConfigNode,
    resolver: &dyn TargetResolver,
    flags: Flags,
    full_key: &str,
) -> StrataResult<Built> {
    if flags.recursive {
        instantiate_node(node, resolver, flags, full_key)
    } else {
        Ok(Built::raw(node))
    }
}

fn instantiate_record(
    record: &Record,
    resolver: &dyn TargetResolver,
    flags: Flags,
    args: Vec<Built>,
    full_key: &str,
) -> StrataResult<Built> {
    match record.kind() {
        RecordKind::Plain => {
            let mut fields = BTreeMap::new();
            for (name, node) in record.fields() {
                let built =
                    instantiate_field(node, resolver, flags, &child_key(full_key, name))?;
                fields.insert(name.clone(), built);
            }
            Ok(Built::Record(fields))
        }
        RecordKind::Target { target } => {
            let mut keyword = BTreeMap::new();
            for (name, node) in record.fields() {
                let built =
                    instantiate_field(node, resolver, flags, &child_key(full_key, name))?;
                keyword.insert(name.clone(), built);
            }
            let call = CallArgs {
                positional: args,
                keyword,
            };
            let known_key = (!full_key.is_empty()).then_some(full_key);
            let constructor = resolver.resolve(&target).map_err(|e| {
                std::sync::Arc::new(StrataError::cannot_locate_target(
                    &target,
                    known_key,
                    Box::new(e),
                ))
            })?;
            if flags.partial {
                tracing::trace!(target = %target, "deferring target call");
                return Ok(Built::Deferred(Partial::new(
                    &target,
                    known_key,
                    constructor,
                    call,
                )));
            }
            tracing::trace!(target = %target, "invoking target");
            constructor(call)
                .map_err(|e| StrataError::call_failure(&target, known_key, e))
                .into_shared()
        }
    }
}
