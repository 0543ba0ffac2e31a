use std::fmt;

// used for the client side timestamp
use chrono::{Local, NaiveDateTime};
use serde::Serialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where a table came from: the database it was queried against, the basis
/// (snapshot marker) of that database, and when the client shaped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    db_name: String,
    basis_t: i64,
    #[serde(serialize_with = "serialize_timestamp")]
    client_timestamp: NaiveDateTime,
}

impl Provenance {
    pub fn new(db_name: impl Into<String>, basis_t: i64) -> Self {
        Self::at(db_name, basis_t, Local::now().naive_local())
    }
    pub fn at(db_name: impl Into<String>, basis_t: i64, client_timestamp: NaiveDateTime) -> Self {
        Self {
            db_name: db_name.into(),
            basis_t,
            client_timestamp,
        }
    }
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
    pub fn basis_t(&self) -> i64 {
        self.basis_t
    }
    pub fn client_timestamp(&self) -> NaiveDateTime {
        self.client_timestamp
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "db_name={} basis_t={} client_timestamp={}",
            self.db_name,
            self.basis_t,
            self.client_timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

fn serialize_timestamp<S: serde::Serializer>(t: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&t.format(TIMESTAMP_FORMAT))
}
