//! A session carries the target database and query timeout explicitly, so
//! call sites never depend on process wide state.

use std::time::Duration;

use serde_json::Value;

use crate::config::{DEFAULT_TIMEOUT_SECS, Settings};
use crate::error::{PatternqError, Result};
use crate::query::{DatomsRequest, Query, QueryRequest, QueryResult};
use crate::service::{HttpQueryService, QueryService};
use crate::shape::shape_pull;
use crate::table::Table;

pub struct Session<S> {
    service: S,
    db_name: Option<String>,
    timeout: Duration,
}

impl Session<HttpQueryService> {
    /// A session against the commons described by `settings`.
    pub fn connect(settings: &Settings) -> Result<Self> {
        Ok(Self::from_settings(HttpQueryService::new(settings)?, settings))
    }
}

impl<S: QueryService> Session<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            db_name: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
    pub fn from_settings(service: S, settings: &Settings) -> Self {
        Self {
            service,
            db_name: settings.db_name.clone(),
            timeout: settings.timeout(),
        }
    }
    pub fn with_db(mut self, db_name: impl Into<String>) -> Self {
        self.set_db(db_name);
        self
    }
    /// Make `db_name` the default target for the rest of this session.
    pub fn set_db(&mut self, db_name: impl Into<String>) {
        self.db_name = Some(db_name.into());
    }
    pub fn db_name(&self) -> Option<&str> {
        self.db_name.as_deref()
    }
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
    pub fn service(&self) -> &S {
        &self.service
    }

    fn target<'a>(&'a self, db_name: Option<&'a str>) -> Result<&'a str> {
        db_name.or(self.db_name.as_deref()).ok_or_else(|| {
            PatternqError::Config("no database selected: name one or set a default on the session".to_string())
        })
    }

    /// Query the session's database.
    pub fn query(&self, query: &Query, args: &[Value]) -> Result<QueryResult> {
        self.query_on(None, query, args)
    }
    /// Query `db_name`, or the session's database when `None`.
    pub fn query_on(&self, db_name: Option<&str>, query: &Query, args: &[Value]) -> Result<QueryResult> {
        let db_name = self.target(db_name)?;
        let request = QueryRequest {
            query: query.clone(),
            timeout: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            args: args.to_vec(),
        };
        self.service.query(db_name, &request)
    }
    /// Run a pull query and shape its result into a table with clean names.
    pub fn pull_table(&self, query: &Query, args: &[Value]) -> Result<Table> {
        shape_pull(&self.query(query, args)?)
    }
    pub fn list_datasets(&self) -> Result<Vec<String>> {
        self.service.list_datasets()
    }
    pub fn datoms(&self, request: &DatomsRequest) -> Result<Value> {
        let db_name = self.target(None)?;
        self.service.datoms(db_name, request)
    }
    pub fn measurement_matrix(&self, matrix_key: &str) -> Result<Table> {
        let db_name = self.target(None)?;
        self.service.measurement_matrix(db_name, matrix_key)
    }
}
