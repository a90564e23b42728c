//! Behavioural tests for the instantiation engine.

use std::collections::BTreeMap;

use serde_json::json;
use strata_config::{
    Built, CallArgs, ConfigNode, Record, StrataError, instantiate, instantiate_with,
};
use test_helpers::{Linear, Sgd, symbols};

fn record(value: serde_json::Value) -> Record {
    let node = ConfigNode::from_value(&value).expect("fixture value parses");
    let ConfigNode::Record(record) = node else {
        panic!("fixture must be a record");
    };
    record
}

#[test]
fn plain_records_strip_control_metadata() {
    let root = record(json!({
        "group__": "entrypoint",
        "name__": "train",
        "recursive__": true,
        "seed": 7,
        "tags": ["a", "b"],
    }));
    let built = instantiate(&root, &symbols()).expect("instantiates");
    let fields = built.as_record().expect("plain record");
    assert_eq!(fields.get("seed"), Some(&Built::Int(7)));
    assert_eq!(
        fields.get("tags"),
        Some(&Built::List(vec![
            Built::Str("a".to_owned()),
            Built::Str("b".to_owned())
        ]))
    );
    assert!(!fields.contains_key("recursive__"));
    assert!(!fields.contains_key("name__"));
}

#[test]
fn plain_record_instantiation_is_idempotent_on_plain_values() {
    let root = record(json!({"seed": 7, "nested": {"alpha": 1}}));
    let first = instantiate(&root, &symbols()).expect("first pass");
    let second = instantiate(&root, &symbols()).expect("second pass");
    assert_eq!(first, second);
}

#[test]
fn target_records_invoke_their_target() {
    let root = record(json!({"target__": "optim.SGD", "lr": 0.01}));
    let built = instantiate(&root, &symbols()).expect("constructs");
    assert_eq!(built.downcast_ref::<Sgd>(), Some(&Sgd { lr: 0.01 }));
}

#[test]
fn partial_defers_the_call_and_reproduces_the_result() {
    let root = record(json!({"target__": "optim.SGD", "partial__": true, "lr": 0.01}));
    let built = instantiate(&root, &symbols()).expect("defers");
    let deferred = built.as_deferred().expect("deferred call");
    assert_eq!(deferred.name(), "optim.SGD");

    let invoked = deferred.invoke().expect("deferred call succeeds");
    assert_eq!(invoked.downcast_ref::<Sgd>(), Some(&Sgd { lr: 0.01 }));

    let direct = instantiate(
        &record(json!({"target__": "optim.SGD", "lr": 0.01})),
        &symbols(),
    )
    .expect("direct call");
    assert_eq!(
        invoked.downcast_ref::<Sgd>(),
        direct.downcast_ref::<Sgd>()
    );
}

#[test]
fn partial_call_time_arguments_win_over_bound_ones() {
    let root = record(json!({"target__": "optim.SGD", "partial__": true, "lr": 0.01}));
    let built = instantiate(&root, &symbols()).expect("defers");
    let deferred = built.as_deferred().expect("deferred call");

    let mut extra = CallArgs::new();
    extra.keyword.insert("lr".to_owned(), Built::Float(0.5));
    let invoked = deferred.call(extra).expect("call succeeds");
    assert_eq!(invoked.downcast_ref::<Sgd>(), Some(&Sgd { lr: 0.5 }));
}

#[test]
fn recursive_false_halts_descent() {
    let root = record(json!({
        "target__": "util.keep",
        "recursive__": false,
        "seed": 7,
        "optimizer": {"target__": "optim.SGD", "lr": 0.01},
    }));
    let mut table = symbols();
    table.register("util.keep", |args| {
        Ok(Built::Record(args.keyword.clone()))
    });
    let built = instantiate(&root, &table).expect("constructs");
    let fields = built.as_record().expect("record result");
    // The nested optimizer arrived uninstantiated.
    let optimizer = fields.get("optimizer").expect("optimizer forwarded");
    assert!(matches!(optimizer, Built::Config(ConfigNode::Record(_))));
    assert_eq!(fields.get("seed"), Some(&Built::Int(7)));
}

#[test]
fn recursive_false_on_plain_records_leaves_children_as_is() {
    let root = record(json!({
        "recursive__": false,
        "nested": {"target__": "optim.SGD", "lr": 0.01},
    }));
    let built = instantiate(&root, &symbols()).expect("instantiates");
    let fields = built.as_record().expect("plain record");
    assert!(matches!(
        fields.get("nested"),
        Some(Built::Config(ConfigNode::Record(_)))
    ));
}

#[test]
fn lists_of_records_preserve_order() {
    let root = record(json!({
        "layers": [
            {"target__": "net.Linear", "input": 784, "output": 128},
            {"target__": "net.Linear", "input": 128, "output": 10},
        ],
    }));
    let built = instantiate(&root, &symbols()).expect("constructs");
    let fields = built.as_record().expect("record");
    let layers = fields.get("layers").and_then(Built::as_list).expect("list");
    assert_eq!(layers.len(), 2);
    assert_eq!(
        layers.first().and_then(|l| l.downcast_ref::<Linear>()),
        Some(&Linear {
            input: 784,
            output: 128
        })
    );
    assert_eq!(
        layers.get(1).and_then(|l| l.downcast_ref::<Linear>()),
        Some(&Linear {
            input: 128,
            output: 10
        })
    );
}

#[test]
fn partial_does_not_propagate_into_list_elements() {
    let root = record(json!({
        "partial__": true,
        "target__": "util.keep",
        "layers": [
            {"target__": "net.Linear", "input": 4, "output": 2},
        ],
    }));
    let mut table = symbols();
    table.register("util.keep", |args| Ok(Built::Record(args.keyword.clone())));
    let built = instantiate(&root, &table).expect("defers");
    let deferred = built.as_deferred().expect("root call deferred");
    let layers = deferred
        .bound()
        .get("layers")
        .and_then(Built::as_list)
        .expect("layers bound");
    // The element was constructed eagerly, not deferred.
    assert!(layers.first().and_then(|l| l.downcast_ref::<Linear>()).is_some());
}

#[test]
fn unresolvable_target_reports_the_target_string() {
    let root = record(json!({
        "model": {"target__": "nonexistent.Module.Thing", "size": 1},
    }));
    let err = instantiate(&root, &symbols()).expect_err("unknown target");
    let text = err.to_string();
    assert!(text.contains("cannot locate target 'nonexistent.Module.Thing'"));
    assert!(text.contains("full_key: model"));
    assert!(matches!(*err, StrataError::Instantiation { .. }));
    assert!(std::error::Error::source(&*err).is_some());
}

#[test]
fn call_failures_chain_the_cause_and_name_the_full_key() {
    let root = record(json!({
        "optimizer": {"target__": "optim.SGD", "lr": -1.0},
    }));
    let err = instantiate(&root, &symbols()).expect_err("negative learning rate");
    let text = err.to_string();
    assert!(text.contains("error in call to target 'optim.SGD'"));
    assert!(text.contains("full_key: optimizer"));
    let cause = std::error::Error::source(&*err).map(ToString::to_string);
    assert_eq!(
        cause.as_deref(),
        Some("learning rate must be positive, got -1")
    );
}

#[test]
fn extra_overrides_merge_into_the_root_before_recursion() {
    let root = record(json!({"target__": "optim.SGD", "lr": 0.1}));
    let mut overrides = BTreeMap::new();
    overrides.insert(
        "lr".to_owned(),
        ConfigNode::from_value(&json!(0.01)).expect("override parses"),
    );
    let built =
        instantiate_with(&root, &symbols(), Vec::new(), &overrides).expect("constructs");
    assert_eq!(built.downcast_ref::<Sgd>(), Some(&Sgd { lr: 0.01 }));
}

#[test]
fn extra_positional_arguments_reach_the_root_target() {
    let root = record(json!({"target__": "util.identity"}));
    let built = instantiate_with(
        &root,
        &symbols(),
        vec![Built::Str("hello".to_owned())],
        &BTreeMap::new(),
    )
    .expect("constructs");
    assert_eq!(built, Built::Str("hello".to_owned()));
}

#[test]
fn scalars_pass_through_unchanged() {
    let root = record(json!({"seed": 7, "rate": 0.5, "label": "x", "flag": true, "none": null, "unset": "???"}));
    let built = instantiate(&root, &symbols()).expect("instantiates");
    let fields = built.as_record().expect("record");
    assert_eq!(fields.get("none"), Some(&Built::Null));
    assert_eq!(fields.get("unset"), Some(&Built::Missing));
    assert_eq!(fields.get("flag"), Some(&Built::Bool(true)));
}
