//! Test helpers shared across crates.
//!
//! Provides a populated symbol table of constructor targets, the domain
//! objects they build, and the schema fixtures the integration tests
//! compose against.

use serde_json::json;
use strata_config::{
    Built, FieldDef, FieldKind, Object, RegistryBuilder, SchemaRegistry, SchemaType, SymbolTable,
};

/// Stochastic gradient descent optimiser constructed from config.
#[derive(Debug, Clone, PartialEq)]
pub struct Sgd {
    /// Learning rate.
    pub lr: f64,
}

/// Adam optimiser constructed from config.
#[derive(Debug, Clone, PartialEq)]
pub struct Adam {
    /// Learning rate.
    pub lr: f64,
}

/// Linear layer constructed from config.
#[derive(Debug, Clone, PartialEq)]
pub struct Linear {
    /// Input feature count.
    pub input: i64,
    /// Output feature count.
    pub output: i64,
}

/// Build the symbol table every instantiation test resolves against.
///
/// Registers `optim.SGD`, `optim.Adam`, `net.Linear`, plus `util.identity`
/// (returns its first positional argument) and `util.fail` (always errors)
/// for exercising call plumbing and failure paths.
#[must_use]
pub fn symbols() -> SymbolTable {
    let mut table = SymbolTable::new();
    table.register("optim.SGD", |args| {
        let lr = args.require("lr")?.as_f64().ok_or("lr must be a float")?;
        if lr <= 0.0 {
            return Err(format!("learning rate must be positive, got {lr}").into());
        }
        Ok(Built::Object(Object::new(Sgd { lr })))
    });
    table.register("optim.Adam", |args| {
        let lr = args.require("lr")?.as_f64().ok_or("lr must be a float")?;
        Ok(Built::Object(Object::new(Adam { lr })))
    });
    table.register("net.Linear", |args| {
        let input = args.require("input")?.as_i64().ok_or("input must be an int")?;
        let output = args
            .require("output")?
            .as_i64()
            .ok_or("output must be an int")?;
        Ok(Built::Object(Object::new(Linear { input, output })))
    });
    table.register("util.identity", |args| {
        args.positional
            .first()
            .cloned()
            .ok_or_else(|| "identity expects one positional argument".into())
    });
    table.register("util.fail", |_args| Err("deliberate failure".into()));
    table
}

/// Schema for the `sgd` optimiser fragment.
#[must_use]
pub fn sgd_schema() -> SchemaType {
    SchemaType::new("optimizer", "sgd")
        .with_target("optim.SGD")
        .with_field("lr", FieldDef::new(FieldKind::Float).with_default(json!(0.1)))
}

/// Schema for the `adam` optimiser fragment.
#[must_use]
pub fn adam_schema() -> SchemaType {
    SchemaType::new("optimizer", "adam")
        .with_target("optim.Adam")
        .with_field("lr", FieldDef::new(FieldKind::Float).with_default(json!(0.001)))
}

/// Entry-point schema used by the composition tests.
///
/// Declares an integer `seed`, a list of `tags` and a nested `optimizer`
/// config defaulting to the registered `sgd` fragment.
#[must_use]
pub fn entry_schema() -> SchemaType {
    SchemaType::new("entrypoint", "train")
        .with_field("seed", FieldDef::new(FieldKind::Int).with_default(json!(1)))
        .with_field("tags", FieldDef::new(FieldKind::List).with_default(json!([])))
        .with_field(
            "optimizer",
            FieldDef::new(FieldKind::Config {
                group: "optimizer".to_owned(),
            })
            .with_default(json!("sgd")),
        )
}

/// Build a registry holding the fixture schemas.
///
/// # Panics
///
/// Panics when the fixture schemas fail to register; they never collide.
#[must_use]
pub fn registry() -> SchemaRegistry {
    let mut builder = RegistryBuilder::new();
    for schema in [sgd_schema(), adam_schema(), entry_schema()] {
        if let Err(err) = builder.register(schema) {
            panic!("fixture registration failed: {err}");
        }
    }
    builder.build()
}
