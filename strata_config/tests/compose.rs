//! Behavioural tests for the composition engine.

use std::io::Write as _;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::json;
use strata_config::{
    ComposeOptions, ConfigNode, Scalar, StrataError, compose, instantiate, to_document,
};
use test_helpers::{Adam, Sgd, entry_schema, registry, symbols};

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

fn options(overrides: &[&str]) -> ComposeOptions {
    ComposeOptions {
        overrides: overrides.iter().map(|s| (*s).to_owned()).collect(),
        ..ComposeOptions::default()
    }
}

#[test]
fn defaults_alone_compose() {
    let record = compose(&entry_schema(), &registry(), &options(&[])).expect("composes");
    assert_eq!(record.get("seed"), Some(&ConfigNode::Scalar(Scalar::Int(1))));
    let Some(ConfigNode::Record(optimizer)) = record.get("optimizer") else {
        panic!("optimizer expanded from its default fragment");
    };
    assert_eq!(optimizer.target_path(), Some("optim.SGD"));
}

#[test]
fn overrides_beat_document_beats_defaults() {
    let (_guard, dir) = temp_dir();
    write_file(&dir, "train.toml", "[entrypoint]\nseed = 2\n");
    let mut opts = options(&["seed=3"]);
    opts.document_dir = Some(dir.clone());
    opts.document_name = Some("train".to_owned());
    let record = compose(&entry_schema(), &registry(), &opts).expect("composes");
    assert_eq!(record.get("seed"), Some(&ConfigNode::Scalar(Scalar::Int(3))));

    let mut doc_only = options(&[]);
    doc_only.document_dir = Some(dir);
    doc_only.document_name = Some("train".to_owned());
    let doc_record = compose(&entry_schema(), &registry(), &doc_only).expect("composes");
    assert_eq!(
        doc_record.get("seed"),
        Some(&ConfigNode::Scalar(Scalar::Int(2)))
    );
}

#[test]
fn sgd_scenario_composes_and_instantiates() {
    // Schema defaults lr to 0.1; the override narrows it to 0.01 with an
    // empty document.
    let record = compose(
        &entry_schema(),
        &registry(),
        &options(&["optimizer.lr=0.01"]),
    )
    .expect("composes");
    let built = instantiate(&record, &symbols()).expect("instantiates");
    let fields = built.as_record().expect("record result");
    let sgd = fields
        .get("optimizer")
        .and_then(|o| o.downcast_ref::<Sgd>())
        .expect("constructed optimiser");
    assert_eq!(sgd, &Sgd { lr: 0.01 });
}

#[test]
fn fragment_names_resolve_through_the_registry() {
    let record = compose(
        &entry_schema(),
        &registry(),
        &options(&["optimizer=adam"]),
    )
    .expect("composes");
    let built = instantiate(&record, &symbols()).expect("instantiates");
    let fields = built.as_record().expect("record result");
    let adam = fields
        .get("optimizer")
        .and_then(|o| o.downcast_ref::<Adam>())
        .expect("adam constructed");
    assert_eq!(adam, &Adam { lr: 0.001 });
}

#[test]
fn document_entries_resolve_fragment_names_too() {
    let (_guard, dir) = temp_dir();
    write_file(
        &dir,
        "train.toml",
        "[entrypoint]\noptimizer = \"adam\"\n\"optimizer.lr\" = 0.5\n",
    );
    let mut opts = options(&[]);
    opts.document_dir = Some(dir);
    opts.document_name = Some("train".to_owned());
    let record = compose(&entry_schema(), &registry(), &opts).expect("composes");
    let Some(ConfigNode::Record(optimizer)) = record.get("optimizer") else {
        panic!("optimizer resolved");
    };
    assert_eq!(optimizer.target_path(), Some("optim.Adam"));
    assert_eq!(
        optimizer.get("lr"),
        Some(&ConfigNode::Scalar(Scalar::Float(0.5)))
    );
}

#[test]
fn override_without_equals_fails_composition() {
    let err = compose(&entry_schema(), &registry(), &options(&["foo"]))
        .expect_err("malformed override");
    assert!(matches!(*err, StrataError::Composition { .. }));
    assert!(err.to_string().contains("foo"));
}

#[test]
fn unknown_top_level_key_fails_composition() {
    let err = compose(&entry_schema(), &registry(), &options(&["typo=1"]))
        .expect_err("unknown key");
    assert!(err.to_string().contains("typo"));
    assert!(err.to_string().contains("override"));
}

#[test]
fn unresolved_fragment_name_fails_composition() {
    let err = compose(
        &entry_schema(),
        &registry(),
        &options(&["optimizer=lion"]),
    )
    .expect_err("unknown fragment");
    assert!(matches!(*err, StrataError::Composition { .. }));
    assert!(err.to_string().contains("lion"));
}

#[test]
fn missing_named_document_fails_composition() {
    let (_guard, dir) = temp_dir();
    let mut opts = options(&[]);
    opts.document_dir = Some(dir);
    opts.document_name = Some("absent".to_owned());
    let err = compose(&entry_schema(), &registry(), &opts).expect_err("no document");
    assert!(err.to_string().contains("absent"));
}

#[test]
fn document_without_entrypoint_section_fails() {
    let (_guard, dir) = temp_dir();
    let path = write_file(&dir, "train.toml", "[other]\nseed = 2\n");
    let mut opts = options(&[]);
    opts.document_path = Some(path);
    let err = compose(&entry_schema(), &registry(), &opts).expect_err("no section");
    assert!(err.to_string().contains("entrypoint"));
}

#[test]
fn list_values_replace_wholesale() {
    let (_guard, dir) = temp_dir();
    write_file(
        &dir,
        "train.toml",
        "[entrypoint]\ntags = [\"from-doc\", \"extra\"]\n",
    );
    let mut opts = options(&[]);
    opts.document_dir = Some(dir);
    opts.document_name = Some("train".to_owned());
    let record = compose(&entry_schema(), &registry(), &opts).expect("composes");
    let Some(ConfigNode::List(tags)) = record.get("tags") else {
        panic!("tags list present");
    };
    assert_eq!(tags.len(), 2);
}

#[test]
fn bypass_mode_skips_document_composition() {
    let (_guard, dir) = temp_dir();
    let config = write_file(
        &dir,
        "composed.toml",
        concat!(
            "seed = 9\n",
            "tags = []\n",
            "[optimizer]\n",
            "target__ = \"optim.SGD\"\n",
            "lr = 0.2\n",
        ),
    );
    // A document that would change seed; bypass must ignore it.
    write_file(&dir, "train.toml", "[entrypoint]\nseed = 2\n");
    let mut opts = options(&["seed=11"]);
    opts.document_dir = Some(dir);
    opts.document_name = Some("train".to_owned());
    opts.bypass = Some(config);
    let record = compose(&entry_schema(), &registry(), &opts).expect("composes");
    assert_eq!(record.get("seed"), Some(&ConfigNode::Scalar(Scalar::Int(11))));
    let Some(ConfigNode::Record(optimizer)) = record.get("optimizer") else {
        panic!("optimizer kept from serialised config");
    };
    assert_eq!(
        optimizer.get("lr"),
        Some(&ConfigNode::Scalar(Scalar::Float(0.2)))
    );
}

#[test]
fn composed_records_serialise_for_show() {
    let record = compose(
        &entry_schema(),
        &registry(),
        &options(&["optimizer.lr=0.01"]),
    )
    .expect("composes");
    let shown = to_document(&record).expect("serialises");
    assert!(shown.contains("seed = 1"));
    assert!(shown.contains("lr = 0.01"));
}
