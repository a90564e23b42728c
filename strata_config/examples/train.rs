//! Example entry point wiring composition and instantiation together.
//!
//! Schemas are registered programmatically here; pass `--schema-dir` to
//! load further definitions from documents. Overrides compose over the
//! schema defaults, e.g.:
//!
//! ```text
//! train optimizer.lr=0.01 --show
//! ```

use std::io::{self, Write};

use camino::Utf8Path;
use clap::Parser;
use serde_json::json;
use strata_config::{
    Built, Cli, FieldDef, FieldKind, Object, RegistryBuilder, SchemaType, SymbolTable, compose,
    discover, instantiate, to_document,
};

/// Optimiser constructed from the `optim.SGD` target.
#[derive(Debug)]
struct Sgd {
    lr: f64,
}

fn symbols() -> SymbolTable {
    let mut table = SymbolTable::new();
    table.register("optim.SGD", |args| {
        let lr = args.require("lr")?.as_f64().ok_or("lr must be a float")?;
        Ok(Built::Object(Object::new(Sgd { lr })))
    });
    table
}

fn entry_schema() -> SchemaType {
    SchemaType::new("entrypoint", "train")
        .with_field("seed", FieldDef::new(FieldKind::Int).with_default(json!(1)))
        .with_field(
            "optimizer",
            FieldDef::new(FieldKind::Config {
                group: "optimizer".to_owned(),
            })
            .with_default(json!("sgd")),
        )
}

fn sgd_schema() -> SchemaType {
    SchemaType::new("optimizer", "sgd")
        .with_target("optim.SGD")
        .with_field("lr", FieldDef::new(FieldKind::Float).with_default(json!(0.1)))
}

fn run(cli: &Cli) -> Result<String, String> {
    let mut builder = RegistryBuilder::new();
    builder.register(sgd_schema()).map_err(|e| e.to_string())?;
    builder.register(entry_schema()).map_err(|e| e.to_string())?;
    if let Some(dir) = &cli.schema_dir {
        discover(&mut builder, dir).map_err(|e| e.to_string())?;
    }
    let registry = builder.build();

    let entry = registry
        .lookup("entrypoint", "train")
        .map_err(|e| e.to_string())?;
    let options = cli.compose_options(Utf8Path::new("."));
    let record = compose(&entry, &registry, &options).map_err(|e| e.to_string())?;

    if cli.show {
        return to_document(&record).map_err(|e| e.to_string());
    }
    let built = instantiate(&record, &symbols()).map_err(|e| e.to_string())?;
    let fields = built
        .as_record()
        .ok_or_else(|| "entry point must compose a record".to_owned())?;
    let sgd = fields
        .get("optimizer")
        .and_then(Built::downcast_ref::<Sgd>)
        .ok_or_else(|| "optimizer was not constructed".to_owned())?;
    Ok(format!("training with lr = {}", sgd.lr))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let output = run(&cli)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}
