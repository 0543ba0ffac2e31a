//! PatternQ – a client for querying the biomedical knowledge-graph commons and
//! shaping what comes back into flat tables.
//!
//! Queries are Datalog, posted to the commons as JSON. A pull query answers with
//! one nested document per matched entity, in which:
//! * enumerated values are wrapped as `{":db/ident": ":sex/female"}`,
//! * attribute names carry namespace syntax (`:sample/study-day`),
//! * one-to-many relations come back as sequences of nested documents.
//!
//! ## Modules
//! * [`walk`] – generic post-order transform over JSON values.
//! * [`shape`] – enum flattening, pull-to-table, column name normalization and
//!   expansion of nested one-to-many relations.
//! * [`table`] – the [`table::Table`] handed back to callers.
//! * [`query`] – query objects, request bodies and the [`query::QueryResult`] envelope.
//! * [`service`] – the [`service::QueryService`] seam and its HTTP implementation.
//! * [`session`] – explicit per-session target database and timeout.
//! * [`config`] – settings from file and `PATTERNQ_*` environment variables.
//!
//! ## Quick Start
//! ```
//! use serde_json::json;
//! use patternq::query::QueryResult;
//! use patternq::shape::shape_pull;
//! let result = QueryResult::new(
//!     vec![json!([{":sample/id": "S1", ":sample/specimen": {":db/ident": ":specimen/blood"}}])],
//!     "tcga-brca",
//!     7,
//! );
//! let table = shape_pull(&result).unwrap();
//! assert_eq!(table.columns(), ["sample-id", "sample-specimen"]);
//! assert_eq!(table.value(0, "sample-specimen"), &json!(":specimen/blood"));
//! ```

pub mod config;
pub mod error;
pub mod provenance;
pub mod query;
pub mod service;
pub mod session;
pub mod shape;
pub mod table;
pub mod walk;

pub use error::{PatternqError, Result};
