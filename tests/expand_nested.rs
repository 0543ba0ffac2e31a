use patternq::PatternqError;
use patternq::query::QueryResult;
use patternq::shape::{CollisionPolicy, expand_nested, expand_nested_by, expand_nested_with, shape_pull};
use patternq::table::{Row, Table};
use serde_json::{Value, json};

fn row(v: Value) -> Row {
    v.as_object().cloned().expect("row literal must be an object")
}

fn relation_len(value: &Value) -> usize {
    value.as_array().map(|a| a.len()).unwrap_or(0)
}

#[test]
fn left_join_keeps_parent_without_documents() {
    let table = Table::from_rows(vec![
        row(json!({"id": 1, "rel": [{"rid": 10, "x": "p"}]})),
        row(json!({"id": 2, "rel": []})),
    ]);
    let expanded = expand_nested_by(&table, "rel", "rid").expect("expand ok");
    assert_eq!(expanded.columns(), ["id", "rel_rid", "x"]);
    assert_eq!(
        expanded.rows(),
        [
            row(json!({"id": 1, "rel_rid": 10, "x": "p"})),
            row(json!({"id": 2, "rel_rid": null, "x": null})),
        ]
    );
}

#[test]
fn explode_row_count_law() {
    let table = Table::from_rows(vec![
        row(json!({"id": 1, "rel": [{"rid": 1}, {"rid": 2}, {"rid": 3}]})),
        row(json!({"id": 2, "rel": []})),
        row(json!({"id": 3, "rel": [{"rid": 4, "y": true}]})),
        row(json!({"id": 4})),
    ]);
    let expected: usize = table
        .rows()
        .iter()
        .map(|r| relation_len(r.get("rel").unwrap_or(&Value::Null)).max(1))
        .sum();
    let expanded = expand_nested_by(&table, "rel", "rid").expect("expand ok");
    assert_eq!(expanded.len(), expected);
    assert_eq!(expanded.len(), 6);
    assert_eq!(expanded.value(3, "y"), &json!(null));
    assert_eq!(expanded.value(4, "y"), &json!(true));
    assert_eq!(expanded.value(5, "id"), &json!(4), "row without the column survives");
}

#[test]
fn measurement_sets_expand_on_entity_id() {
    let result = QueryResult::new(
        vec![
            json!([{
                ":assay/name": "wes",
                ":assay/technology": {":db/ident": ":assay.technology/WES"},
                ":assay/measurement-sets": [
                    {":db/id": 101, ":measurement-set/name": "variants"},
                    {":db/id": 102, ":measurement-set/name": "cnv"},
                ],
            }]),
            json!([{
                ":assay/name": "rna",
                ":assay/technology": {":db/ident": ":assay.technology/RNA-seq"},
                ":assay/measurement-sets": [
                    {":db/id": 103, ":measurement-set/name": "gx", ":measurement-set/description": "expression"},
                ],
            }]),
        ],
        "tcga-brca",
        9,
    );
    let table = shape_pull(&result).expect("shape ok");
    let expanded = expand_nested(&table, "assay-measurement-sets").expect("expand ok");
    assert_eq!(
        expanded.columns(),
        [
            "assay-name",
            "assay-technology",
            "assay-measurement-sets_db-id",
            "measurement-set-name",
            "measurement-set-description",
        ]
    );
    assert_eq!(expanded.len(), 3);
    assert_eq!(expanded.value(1, "assay-measurement-sets_db-id"), &json!(102));
    assert_eq!(expanded.value(1, "measurement-set-name"), &json!("cnv"));
    assert_eq!(expanded.value(1, "measurement-set-description"), &json!(null));
    assert_eq!(expanded.value(2, "assay-technology"), &json!(":assay.technology/RNA-seq"));
    assert!(expanded.provenance().is_some(), "provenance survives expansion");
}

#[test]
fn document_without_identifier_is_a_left_join_miss() {
    let table = Table::from_rows(vec![row(json!({"id": 1, "rel": [{"x": "orphan"}, {"rid": 7, "x": "kept"}]}))]);
    let expanded = expand_nested_by(&table, "rel", "rid").expect("miss is not fatal");
    assert_eq!(expanded.len(), 2);
    assert_eq!(expanded.rows()[0], row(json!({"id": 1, "rel_rid": null, "x": null})));
    assert_eq!(expanded.rows()[1], row(json!({"id": 1, "rel_rid": 7, "x": "kept"})));
}

#[test]
fn nested_columns_clashing_with_parent_are_prefixed() {
    let table = Table::from_rows(vec![row(json!({"name": "parent", "rel": [{"rid": 1, "name": "child"}]}))]);
    let expanded = expand_nested_by(&table, "rel", "rid").expect("expand ok");
    assert_eq!(expanded.columns(), ["name", "rel_rid", "rel-name"]);
    assert_eq!(expanded.value(0, "name"), &json!("parent"));
    assert_eq!(expanded.value(0, "rel-name"), &json!("child"));
}

#[test]
fn missing_column_is_an_error() {
    let table = Table::from_rows(vec![row(json!({"id": 1}))]);
    match expand_nested(&table, "rel") {
        Err(PatternqError::MissingColumn(c)) => assert_eq!(c, "rel"),
        other => panic!("expected missing column, got {other:?}"),
    }
}

#[test]
fn scalar_where_relation_expected_is_a_shape_mismatch() {
    let table = Table::from_rows(vec![row(json!({"id": 1, "rel": "not a relation"}))]);
    assert!(matches!(
        expand_nested_by(&table, "rel", "rid"),
        Err(PatternqError::ShapeMismatch { .. })
    ));
    let scalars = Table::from_rows(vec![row(json!({"id": 1, "rel": [1, 2]}))]);
    assert!(matches!(
        expand_nested_by(&scalars, "rel", "rid"),
        Err(PatternqError::ShapeMismatch { .. })
    ));
}

#[test]
fn identifier_column_clashing_with_parent_is_a_collision() {
    let table = Table::from_rows(vec![row(json!({"rel_rid": "parent", "rel": [{"rid": 1, "x": 2}]}))]);
    match expand_nested_by(&table, "rel", "rid") {
        Err(PatternqError::NameCollision { first, normalized, .. }) => {
            assert_eq!(first, "rel_rid");
            assert_eq!(normalized, "rel_rid");
        }
        other => panic!("expected a name collision, got {other:?}"),
    }
    assert_eq!(table.value(0, "rel_rid"), &json!("parent"), "input untouched");
}

#[test]
fn nested_name_collisions_follow_the_policy() {
    let table = Table::from_rows(vec![row(json!({"id": 1, "rel": [{"rid": 1, ":a/b": "old", "a-b": "new"}]}))]);
    assert!(matches!(
        expand_nested_by(&table, "rel", "rid"),
        Err(PatternqError::NameCollision { .. })
    ));
    let expanded = expand_nested_with(&table, "rel", "rid", CollisionPolicy::LastWins).expect("expand ok");
    assert_eq!(expanded.columns(), ["id", "rel_rid", "a-b"]);
    assert_eq!(expanded.value(0, "a-b"), &json!("new"));
}
