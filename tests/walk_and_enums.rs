use patternq::shape::{flatten_enums, maybe_flatten_enum};
use patternq::walk::walk;
use serde_json::{Value, json};

fn samples() -> Vec<Value> {
    vec![
        json!(null),
        json!(42),
        json!("plain"),
        json!([1, [2, [3]], {"a": null}]),
        json!({":sample/id": "S1", ":sample/specimen": {":db/ident": ":specimen/blood"}}),
        json!([[{":subject/race": [{":db/ident": ":race/asian"}, {":db/ident": ":race/white"}]}]]),
        json!({"outer": {"inner": {":db/ident": {":db/ident": "deep"}}}}),
    ]
}

#[test]
fn identity_walk_reproduces_input() {
    for v in samples() {
        assert_eq!(walk(|node| node, v.clone()), v, "walk(identity) must be a no-op");
    }
}

#[test]
fn walk_is_post_order() {
    // a parent sees children that were already rewritten
    let counted = walk(
        |node| match node {
            Value::Array(elements) => json!(elements.iter().filter(|e| **e == json!("seen")).count()),
            Value::String(_) => json!("seen"),
            other => other,
        },
        json!(["x", "y", 3]),
    );
    assert_eq!(counted, json!(2));
}

#[test]
fn walk_leaves_keys_untouched() {
    let upper = walk(
        |node| match node {
            Value::String(s) => Value::String(s.to_uppercase()),
            other => other,
        },
        json!({"key": "value", "list": ["a"]}),
    );
    assert_eq!(upper, json!({"key": "VALUE", "list": ["A"]}));
}

#[test]
fn enum_reference_collapses_to_ident() {
    assert_eq!(flatten_enums(json!({":db/ident": "foo"})), json!("foo"));
    assert_eq!(
        flatten_enums(json!([{":db/ident": "a"}, {":db/ident": "b"}])),
        json!(["a", "b"])
    );
    assert_eq!(flatten_enums(json!({"x": {":db/ident": "a"}})), json!({"x": "a"}));
}

#[test]
fn enum_wrapper_with_extra_keys_still_collapses() {
    assert_eq!(
        maybe_flatten_enum(json!({":db/ident": ":sex/female", ":db/id": 17})),
        json!(":sex/female")
    );
    assert_eq!(maybe_flatten_enum(json!({":db/id": 17})), json!({":db/id": 17}));
    assert_eq!(maybe_flatten_enum(json!(3)), json!(3));
}

#[test]
fn nested_wrappers_collapse_in_one_pass() {
    assert_eq!(
        flatten_enums(json!({"outer": {"inner": {":db/ident": {":db/ident": "deep"}}}})),
        json!({"outer": {"inner": "deep"}})
    );
}

#[test]
fn flattening_is_idempotent() {
    for v in samples() {
        let once = flatten_enums(v);
        assert_eq!(flatten_enums(once.clone()), once);
    }
}
