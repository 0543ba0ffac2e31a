//! Declarative queries sent to the commons and the envelope they come back in.
//!
//! The query dialect itself is Datalog as understood by the commons; a [`Query`]
//! only carries its `:find`, `:in` and `:where` parts as JSON so that it can be
//! built in code or read from a file.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{PatternqError, Result};
use crate::provenance::Provenance;
use crate::shape::flatten_enums;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(rename = ":find")]
    pub find: Vec<Value>,
    #[serde(rename = ":in", default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Value>,
    #[serde(rename = ":where", default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<Value>,
}

impl Query {
    /// A query finding the given logic variables, e.g. `["?hgnc"]`.
    pub fn find<I, S>(variables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            find: variables.into_iter().map(|v| Value::String(v.into())).collect(),
            ..Self::default()
        }
    }
    /// A query returning one pull document per match of `variable`.
    pub fn pull(variable: &str, pattern: Value) -> Self {
        Self {
            find: vec![json!(["pull", variable, pattern])],
            ..Self::default()
        }
    }
    pub fn inputs<I: IntoIterator<Item = Value>>(mut self, inputs: I) -> Self {
        self.inputs = inputs.into_iter().collect();
        self
    }
    pub fn clause(mut self, clause: Value) -> Self {
        self.clauses.push(clause);
        self
    }
}

/// Body of a `POST /query/{db}` call. The timeout is given to the server in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query: Query,
    pub timeout: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Value>,
}

/// Body of a `POST /datoms/{db}` call, reading raw datoms from one index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatomsRequest {
    pub index: String,
    pub components: Vec<Value>,
    pub offset: u64,
    pub limit: u64,
}

impl DatomsRequest {
    pub fn new(index: impl Into<String>, components: Vec<Value>) -> Self {
        Self {
            index: index.into(),
            components,
            offset: 0,
            limit: 1000,
        }
    }
    pub fn page(mut self, offset: u64, limit: u64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }
}

/// The envelope a query comes back in: one relation per match, plus the
/// database and basis it was computed against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub query_result: Vec<Value>,
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub basis_t: i64,
}

impl QueryResult {
    pub fn new(query_result: Vec<Value>, db_name: impl Into<String>, basis_t: i64) -> Self {
        Self {
            query_result,
            db_name: db_name.into(),
            basis_t,
        }
    }
    /// Collapse every enum reference in the result relations to its ident.
    pub fn flatten_enums(self) -> Self {
        let query_result = self.query_result.into_iter().map(flatten_enums).collect();
        Self { query_result, ..self }
    }
    pub fn provenance(&self) -> Provenance {
        Provenance::new(self.db_name.clone(), self.basis_t)
    }
    pub fn len(&self) -> usize {
        self.query_result.len()
    }
    pub fn is_empty(&self) -> bool {
        self.query_result.is_empty()
    }
    /// The `index`-th element of every relation, e.g. the symbols out of `[[g1], [g2]]`.
    pub fn column_values(&self, index: usize) -> Result<Vec<Value>> {
        self.query_result
            .iter()
            .enumerate()
            .map(|(i, relation)| match relation {
                Value::Array(tuple) => tuple.get(index).cloned().ok_or_else(|| {
                    PatternqError::ShapeMismatch {
                        context: format!("relation {i}"),
                        expected: "a tuple long enough for the requested position",
                        found: "shorter sequence",
                    }
                }),
                other => Err(PatternqError::shape(format!("relation {i}"), "sequence", other)),
            })
            .collect()
    }
}
