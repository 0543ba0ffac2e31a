//! The query service: whatever executes a [`Query`](crate::query::Query) against a
//! database and hands back a [`QueryResult`]. [`HttpQueryService`] talks to the
//! commons over blocking HTTP; tests and offline tools can plug in their own.

use std::io::Read;
use std::time::{Duration, Instant};

use flate2::read::GzDecoder;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::ACCEPT;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::error::{PatternqError, Result};
use crate::query::{DatomsRequest, QueryRequest, QueryResult};
use crate::table::{Row, Table};

// grace on top of the server side query timeout before giving up on the response
const TIMEOUT_GRACE: Duration = Duration::from_secs(2);

pub trait QueryService {
    /// Run a query against `db_name`. Called once per query, never retried.
    fn query(&self, db_name: &str, request: &QueryRequest) -> Result<QueryResult>;
    fn list_datasets(&self) -> Result<Vec<String>>;
    fn datoms(&self, db_name: &str, request: &DatomsRequest) -> Result<Value>;
    fn measurement_matrix(&self, db_name: &str, matrix_key: &str) -> Result<Table>;
}

pub struct HttpQueryService {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl HttpQueryService {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("patternq/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key()?.to_string(),
        })
    }
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
    fn post(&self, path: &str, accept: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.endpoint, path);
        debug!(%url, "posting to commons");
        self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, accept)
    }
    // results are handed out as a (presigned) download location
    fn download(&self, location: &str) -> Result<Vec<u8>> {
        let location = location.trim();
        debug!(%location, "downloading result");
        let response = checked(self.client.get(location).send()?)?;
        Ok(response.bytes()?.to_vec())
    }
}

impl QueryService for HttpQueryService {
    fn query(&self, db_name: &str, request: &QueryRequest) -> Result<QueryResult> {
        let started = Instant::now();
        let timeout = Duration::from_millis(request.timeout) + TIMEOUT_GRACE;
        let request = self
            .post(&format!("query/{db_name}"), "text/plain")
            .json(request)
            .timeout(timeout);
        let location = checked(request.send()?)?.text()?;
        let mut result = decode_result(&self.download(&location)?)?;
        result.db_name = db_name.to_string();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(db = db_name, rows = result.len(), basis_t = result.basis_t, ms = elapsed_ms, "query complete");
        Ok(result)
    }
    fn list_datasets(&self) -> Result<Vec<String>> {
        // no request body
        let response = self.post("api-v1/list/datasets", "application/json").send()?;
        Ok(checked(response)?.json()?)
    }
    fn datoms(&self, db_name: &str, request: &DatomsRequest) -> Result<Value> {
        let response = self
            .post(&format!("datoms/{db_name}"), "application/json")
            .json(request)
            .send()?;
        Ok(checked(response)?.json()?)
    }
    fn measurement_matrix(&self, db_name: &str, matrix_key: &str) -> Result<Table> {
        let response = self
            .post(&format!("matrix/{db_name}/{matrix_key}"), "text/plain")
            .json(&json!({}))
            .send()?;
        let location = checked(response)?.text()?;
        let matrix = decode_matrix(&self.download(&location)?)?;
        info!(db = db_name, matrix = matrix_key, rows = matrix.len(), "measurement matrix downloaded");
        Ok(matrix)
    }
}

fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().unwrap_or_default();
    warn!(code = status.as_u16(), %message, "commons returned an error");
    Err(PatternqError::Service {
        status: status.as_u16(),
        message,
    })
}

/// Decode a gzipped JSON result envelope.
pub fn decode_result(bytes: &[u8]) -> Result<QueryResult> {
    Ok(serde_json::from_reader(GzDecoder::new(bytes))?)
}

/// Decode a gzipped, tab separated measurement matrix with a header line.
/// Cells are kept as strings.
pub fn decode_matrix(bytes: &[u8]) -> Result<Table> {
    let mut text = String::new();
    GzDecoder::new(bytes).read_to_string(&mut text)?;
    let mut lines = text.lines().filter(|line| !line.is_empty());
    let header: Vec<String> = lines
        .next()
        .ok_or_else(|| PatternqError::Decode("measurement matrix has no header".to_string()))?
        .split('\t')
        .map(String::from)
        .collect();
    let mut matrix = Table::with_columns(header.clone());
    for (i, line) in lines.enumerate() {
        let cells: Vec<&str> = line.split('\t').collect();
        if cells.len() != header.len() {
            return Err(PatternqError::Decode(format!(
                "measurement matrix line {} has {} cells, expected {}",
                i + 2,
                cells.len(),
                header.len()
            )));
        }
        let row: Row = header
            .iter()
            .zip(cells)
            .map(|(h, c)| (h.clone(), Value::String(c.to_string())))
            .collect();
        matrix.push(row);
    }
    Ok(matrix)
}
