//! Behavioural tests for schema discovery and the shared registry guard.

use std::io::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use strata_config::{
    Built, ComposeOptions, RegistryBuilder, SharedRegistry, compose, instantiate,
};
use test_helpers::{Sgd, symbols};

const DEFINITIONS: &str = r#"
[[schema]]
name = "sgd"
group = "optimizer"
target = "optim.SGD"

[schema.fields.lr]
kind = "float"
default = 0.1

[[schema]]
name = "train"
group = "entrypoint"

[schema.fields.seed]
kind = "int"
default = 1

[schema.fields.optimizer]
kind = "config"
group = "optimizer"
default = "sgd"
"#;

fn write_file(dir: &Utf8Path, name: &str, content: &str) -> Utf8PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(path.as_std_path()).expect("create file");
    file.write_all(content.as_bytes()).expect("write file");
    path
}

fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 path");
    (dir, path)
}

#[test]
fn discovery_registers_every_declaration() {
    let (_guard, dir) = temp_dir();
    write_file(&dir, "schemas.toml", DEFINITIONS);
    let mut builder = RegistryBuilder::new();
    let processed = strata_config::discover(&mut builder, &dir).expect("discovers");
    assert_eq!(processed, 2);
    let registry = builder.build();
    assert!(registry.lookup("optimizer", "sgd").is_ok());
    assert!(registry.lookup("entrypoint", "train").is_ok());
}

#[test]
fn rediscovery_of_identical_definitions_is_idempotent() {
    let (_guard, dir) = temp_dir();
    write_file(&dir, "schemas.toml", DEFINITIONS);
    let mut builder = RegistryBuilder::new();
    strata_config::discover(&mut builder, &dir).expect("first pass");
    strata_config::discover(&mut builder, &dir).expect("second pass is a no-op");
    assert_eq!(builder.len(), 2);
}

#[test]
fn conflicting_discovered_definitions_are_rejected() {
    let (_guard, dir) = temp_dir();
    write_file(&dir, "schemas.toml", DEFINITIONS);
    write_file(
        &dir,
        "zz_conflict.toml",
        concat!(
            "[[schema]]\n",
            "name = \"sgd\"\n",
            "group = \"optimizer\"\n",
            "target = \"optim.Other\"\n",
        ),
    );
    let mut builder = RegistryBuilder::new();
    let err = strata_config::discover(&mut builder, &dir).expect_err("collision");
    assert!(err.to_string().contains("already registered"));
}

#[test]
fn malformed_definition_documents_name_the_file() {
    let (_guard, dir) = temp_dir();
    write_file(
        &dir,
        "broken.toml",
        "[[schema]]\nname = \"x\"\ngroup = \"g\"\n[schema.fields.v]\nkind = \"mystery\"\n",
    );
    let mut builder = RegistryBuilder::new();
    let err = strata_config::discover(&mut builder, &dir).expect_err("bad kind");
    let text = err.to_string();
    assert!(text.contains("broken.toml"));
    assert!(text.contains("mystery"));
}

#[test]
fn discovered_schemas_compose_and_instantiate() {
    let (_guard, dir) = temp_dir();
    write_file(&dir, "schemas.toml", DEFINITIONS);
    let mut builder = RegistryBuilder::new();
    strata_config::discover(&mut builder, &dir).expect("discovers");
    let registry = builder.build();
    let entry = registry.lookup("entrypoint", "train").expect("entry schema");

    let options = ComposeOptions {
        overrides: vec!["optimizer.lr=0.01".to_owned()],
        ..ComposeOptions::default()
    };
    let record = compose(&entry, &registry, &options).expect("composes");
    let built = instantiate(&record, &symbols()).expect("instantiates");
    let fields = built.as_record().expect("record result");
    assert_eq!(
        fields.get("optimizer").and_then(Built::downcast_ref::<Sgd>),
        Some(&Sgd { lr: 0.01 })
    );
}

#[test]
fn shared_registry_builds_exactly_once_across_threads() {
    static SHARED: SharedRegistry = SharedRegistry::new();
    static BUILDS: AtomicUsize = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                let registry = SHARED
                    .get_or_build(|| {
                        BUILDS.fetch_add(1, Ordering::SeqCst);
                        Ok(test_helpers::registry())
                    })
                    .expect("builds");
                assert!(registry.lookup("optimizer", "sgd").is_ok());
            });
        }
    });

    assert_eq!(BUILDS.load(Ordering::SeqCst), 1);
    assert!(SHARED.get().is_some());
}
