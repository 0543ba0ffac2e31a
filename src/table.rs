//! The flat, row/column shaped output handed back to callers.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{PatternqError, Result};
use crate::provenance::Provenance;

pub type Row = Map<String, Value>;

static NULL: Value = Value::Null;

/// Rows keyed by column name. The column list is the union of keys seen across
/// rows, in first-seen order; a key absent from a row reads as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    // same names as `columns`, for constant time lookups on wide tables
    #[serde(skip)]
    known: HashSet<String>,
    rows: Vec<Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provenance: Option<Provenance>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn from_rows<I: IntoIterator<Item = Row>>(rows: I) -> Self {
        let mut table = Self::new();
        for row in rows {
            table.push(row);
        }
        table
    }
    /// Build a table out of plain relation tuples, naming their positions.
    pub fn from_relations(relations: &[Value], columns: &[&str]) -> Result<Self> {
        let mut table = Self::with_columns(columns.iter().map(|c| c.to_string()).collect());
        for (i, relation) in relations.iter().enumerate() {
            let tuple = match relation {
                Value::Array(tuple) => tuple,
                other => return Err(PatternqError::shape(format!("relation {i}"), "sequence", other)),
            };
            if tuple.len() != columns.len() {
                return Err(PatternqError::ShapeMismatch {
                    context: format!("relation {i}"),
                    expected: "one value per column",
                    found: if tuple.len() < columns.len() { "shorter sequence" } else { "longer sequence" },
                });
            }
            let row = columns
                .iter()
                .zip(tuple)
                .map(|(c, v)| (c.to_string(), v.clone()))
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }
    /// Append a row, extending the column list with any keys not seen before.
    pub fn push(&mut self, row: Row) {
        for key in row.keys() {
            if !self.known.contains(key) {
                self.known.insert(key.clone());
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }
    pub(crate) fn with_columns(columns: Vec<String>) -> Self {
        let mut table = Self::default();
        for column in columns {
            if table.known.insert(column.clone()) {
                table.columns.push(column);
            }
        }
        table
    }
    pub fn with_provenance(mut self, provenance: Option<Provenance>) -> Self {
        self.provenance = provenance;
        self
    }
    pub fn provenance(&self) -> Option<&Provenance> {
        self.provenance.as_ref()
    }
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
    pub fn len(&self) -> usize {
        self.rows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
    pub fn has_column(&self, column: &str) -> bool {
        self.known.contains(column)
    }
    /// The value at `row` in `column`, null when the row lacks it.
    pub fn value(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }
    pub fn column(&self, column: &str) -> Result<Vec<&Value>> {
        if !self.has_column(column) {
            return Err(PatternqError::MissingColumn(column.to_string()));
        }
        Ok(self
            .rows
            .iter()
            .map(|r| r.get(column).unwrap_or(&NULL))
            .collect())
    }
    /// One row per element of a sequence valued column, other columns repeated.
    /// An empty sequence keeps its row with null; scalars are left as they are.
    pub fn explode(&self, column: &str) -> Result<Table> {
        if !self.has_column(column) {
            return Err(PatternqError::MissingColumn(column.to_string()));
        }
        let mut exploded = Table::with_columns(self.columns.clone()).with_provenance(self.provenance.clone());
        for row in &self.rows {
            match row.get(column) {
                Some(Value::Array(elements)) if !elements.is_empty() => {
                    for element in elements {
                        let mut copy = row.clone();
                        copy.insert(column.to_string(), element.clone());
                        exploded.rows.push(copy);
                    }
                }
                Some(Value::Array(_)) => {
                    let mut copy = row.clone();
                    copy.insert(column.to_string(), Value::Null);
                    exploded.rows.push(copy);
                }
                _ => exploded.rows.push(row.clone()),
            }
        }
        Ok(exploded)
    }
}
