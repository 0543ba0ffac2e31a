//! Shaping query results into tables.
//!
//! The commons answers pull queries with nested documents in which enumerated
//! values are wrapped as `{":db/ident": ":some/ident"}` and attribute names carry
//! Datalog namespace syntax. The functions here turn such results into flat
//! tables: collapse the enum wrappers, flatten each pulled document into a row,
//! clean up the column names, and expand one-to-many relations into joined rows.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{PatternqError, Result};
use crate::query::QueryResult;
use crate::table::{Row, Table};
use crate::walk::walk;

/// Key of the single attribute an enum reference wraps.
pub const ENUM_IDENT_KEY: &str = ":db/ident";
/// Entity identifier pulled alongside nested documents.
pub const ENTITY_ID_KEY: &str = ":db/id";

lazy_static! {
    // (pattern, replacement), applied in this order over the whole name
    static ref CLEAN_NAMES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r":").unwrap(), ""),
        (Regex::new(r"\?").unwrap(), ""),
        (Regex::new(r"/").unwrap(), "-"),
        (Regex::new(r"\.").unwrap(), "-"),
    ];
}

/// What to do when two column names normalize to the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollisionPolicy {
    #[default]
    Reject,
    /// Merge the columns; per row the later column wins when it holds a value.
    LastWins,
}

/// Collapse a node to its ident if it is an enum reference. Any other keys
/// next to the ident are dropped.
pub fn maybe_flatten_enum(node: Value) -> Value {
    match node {
        Value::Object(mut entries) => {
            if let Some(ident) = entries.get_mut(ENUM_IDENT_KEY) {
                return ident.take();
            }
            Value::Object(entries)
        }
        other => other,
    }
}

/// Collapse every enum reference in `value`, at any depth, to its ident.
pub fn flatten_enums(value: Value) -> Value {
    walk(maybe_flatten_enum, value)
}

/// Flatten a result of single pulled documents into one row per document.
///
/// Nested documents become dotted columns (`a.b`); sequences stay whole in their
/// column and can be expanded afterwards. Enum references are collapsed first.
pub fn pull_to_table(result: &QueryResult) -> Result<Table> {
    let mut table = Table::new().with_provenance(Some(result.provenance()));
    for (i, relation) in result.query_result.iter().enumerate() {
        let document = pulled_document(i, flatten_enums(relation.clone()))?;
        table.push(flatten_document(document));
    }
    debug!(rows = table.len(), columns = table.columns().len(), db = %result.db_name, "pulled documents into table");
    Ok(table)
}

fn pulled_document(i: usize, relation: Value) -> Result<Map<String, Value>> {
    let context = format!("relation {i}");
    match relation {
        Value::Array(tuple) if tuple.len() == 1 => match tuple.into_iter().next() {
            Some(Value::Object(document)) => Ok(document),
            other => Err(PatternqError::shape(context, "pull document", other.as_ref().unwrap_or(&Value::Null))),
        },
        other => Err(PatternqError::shape(context, "single-element sequence", &other)),
    }
}

fn flatten_document(document: Map<String, Value>) -> Row {
    let mut row = Row::new();
    flatten_into(None, document, &mut row);
    row
}

fn flatten_into(prefix: Option<&str>, document: Map<String, Value>, row: &mut Row) {
    for (key, value) in document {
        let name = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key,
        };
        match value {
            Value::Object(nested) => flatten_into(Some(&name), nested, row),
            other => {
                row.insert(name, other);
            }
        }
    }
}

/// Strip namespace and variable sigils from a name: `:sample/study-day.id`
/// becomes `sample-study-day-id`, `?subject-id` becomes `subject-id`.
pub fn clean_name(name: &str) -> String {
    CLEAN_NAMES
        .iter()
        .fold(name.to_string(), |sofar, (pattern, replacement)| {
            pattern.replace_all(&sofar, *replacement).into_owned()
        })
}

/// Rename every column with [`clean_name`], rejecting collisions.
pub fn normalize_names(table: &Table) -> Result<Table> {
    normalize_names_with(table, CollisionPolicy::Reject)
}

pub fn normalize_names_with(table: &Table, policy: CollisionPolicy) -> Result<Table> {
    let renames: Vec<(&str, String)> = table
        .columns()
        .iter()
        .map(|c| (c.as_str(), clean_name(c)))
        .collect();
    let mut columns = Vec::with_capacity(renames.len());
    let mut first_seen: HashMap<&str, &str> = HashMap::new();
    for (raw, clean) in &renames {
        match first_seen.get(clean.as_str()) {
            Some(first) => match policy {
                CollisionPolicy::Reject => {
                    return Err(PatternqError::NameCollision {
                        first: first.to_string(),
                        second: raw.to_string(),
                        normalized: clean.clone(),
                    });
                }
                CollisionPolicy::LastWins => {
                    warn!(first = %first, second = %raw, normalized = %clean, "column names collide, later column wins");
                }
            },
            None => {
                first_seen.insert(clean.as_str(), *raw);
                columns.push(clean.clone());
            }
        }
    }
    let mut normalized = Table::with_columns(columns).with_provenance(table.provenance().cloned());
    for row in table.rows() {
        let mut renamed = Row::new();
        for (raw, clean) in &renames {
            if let Some(value) = row.get(*raw) {
                // a null in a later colliding column does not erase an earlier value
                if value.is_null() && renamed.contains_key(clean) {
                    continue;
                }
                renamed.insert(clean.clone(), value.clone());
            }
        }
        normalized.push(renamed);
    }
    Ok(normalized)
}

/// Flatten enums, pull documents into a table and normalize its names.
pub fn shape_pull(result: &QueryResult) -> Result<Table> {
    normalize_names(&pull_to_table(result)?)
}

/// Expand a column of nested documents joined on their `:db/id`.
pub fn expand_nested(table: &Table, column: &str) -> Result<Table> {
    expand_nested_by(table, column, ENTITY_ID_KEY)
}

/// Expand a column holding sequences of nested documents (a one-to-many relation
/// pulled inline) into one row per document, joined back on `id_field`.
///
/// Every parent row survives: a parent with no documents, or whose document has
/// no identifier, gets nulls in the nested columns. The identifier ends up in a
/// single column `{column}_{id}` in place of `column`; a parent column already
/// carrying that name is a [`PatternqError::NameCollision`]. Nested columns that
/// clash with a parent column are prefixed with `{column}-`.
pub fn expand_nested_by(table: &Table, column: &str, id_field: &str) -> Result<Table> {
    expand_nested_with(table, column, id_field, CollisionPolicy::Reject)
}

/// Like [`expand_nested_by`], with `policy` applied when normalizing the names
/// of the nested documents.
pub fn expand_nested_with(table: &Table, column: &str, id_field: &str, policy: CollisionPolicy) -> Result<Table> {
    if !table.has_column(column) {
        return Err(PatternqError::MissingColumn(column.to_string()));
    }
    let id_key = clean_name(id_field);
    let id_column = format!("{column}_{id_key}");
    if table.has_column(&id_column) {
        return Err(PatternqError::NameCollision {
            first: id_column.clone(),
            second: format!("{column} joined on {id_field}"),
            normalized: id_column,
        });
    }

    let mut exploded: Vec<(&Row, Option<&Map<String, Value>>)> = Vec::new();
    for (i, row) in table.rows().iter().enumerate() {
        match row.get(column) {
            Some(Value::Array(documents)) if !documents.is_empty() => {
                for (j, document) in documents.iter().enumerate() {
                    match document {
                        Value::Object(d) => exploded.push((row, Some(d))),
                        other => {
                            return Err(PatternqError::shape(format!("row {i}, {column}[{j}]"), "nested document", other));
                        }
                    }
                }
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => exploded.push((row, None)),
            Some(other) => {
                return Err(PatternqError::shape(format!("row {i}, {column}"), "sequence of nested documents", other));
            }
        }
    }

    let documents = Table::from_rows(
        exploded
            .iter()
            .filter_map(|(_, d)| d.map(|d| flatten_document(d.clone()))),
    );
    let documents = normalize_names_with(&documents, policy)?;
    let nested_columns: Vec<(String, String)> = documents
        .columns()
        .iter()
        .filter(|c| **c != id_key)
        .map(|c| {
            let renamed = if table.has_column(c) || *c == id_column {
                format!("{column}-{c}")
            } else {
                c.clone()
            };
            (c.clone(), renamed)
        })
        .collect();

    let mut index: HashMap<String, Row> = HashMap::new();
    let mut keys: Vec<Value> = Vec::with_capacity(exploded.len());
    let mut misses = 0usize;
    let mut normalized = documents.into_rows().into_iter();
    for (_, document) in &exploded {
        if document.is_none() {
            keys.push(Value::Null);
            continue;
        }
        let nested = normalized.next().unwrap_or_default();
        match nested.get(&id_key) {
            Some(id) if !id.is_null() => {
                let id = id.clone();
                index.entry(id.to_string()).or_insert(nested);
                keys.push(id);
            }
            _ => {
                misses += 1;
                keys.push(Value::Null);
            }
        }
    }
    if misses > 0 {
        warn!(column, id_field, misses, "nested documents without identifier left unmatched");
    }

    let mut columns = Vec::with_capacity(table.columns().len() + nested_columns.len());
    for c in table.columns() {
        columns.push(if c == column { id_column.clone() } else { c.clone() });
    }
    columns.extend(nested_columns.iter().map(|(_, renamed)| renamed.clone()));
    let mut expanded = Table::with_columns(columns).with_provenance(table.provenance().cloned());
    for ((parent, _), key) in exploded.iter().zip(keys) {
        let matched = if key.is_null() { None } else { index.get(&key.to_string()) };
        let mut row = Row::new();
        for c in table.columns() {
            if c == column {
                row.insert(id_column.clone(), key.clone());
            } else if let Some(value) = parent.get(c) {
                row.insert(c.clone(), value.clone());
            }
        }
        for (nested, renamed) in &nested_columns {
            let value = matched.and_then(|m| m.get(nested)).cloned().unwrap_or(Value::Null);
            row.insert(renamed.clone(), value);
        }
        expanded.push(row);
    }
    debug!(column, rows_in = table.len(), rows_out = expanded.len(), "expanded nested documents");
    Ok(expanded)
}
