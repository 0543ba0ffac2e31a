//! Client settings, read with the `config` crate from an optional file and
//! from `PATTERNQ_*` environment variables (the environment wins).

use std::time::Duration;

use ::config::{Config, Environment, File};
use serde::Deserialize;
use tracing::warn;

use crate::error::{PatternqError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://data-commons.rcrf-dev.org";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const ENV_PREFIX: &str = "PATTERNQ";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    /// Base URL of the commons.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer token; only required once a service talks to the commons.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Database targeted when a call does not name one.
    #[serde(default)]
    pub db_name: Option<String>,
    /// Query timeout handed to the commons.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: None,
            db_name: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Settings {
    /// Read settings from `path` (if given) overlaid with the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        let config = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        Self::from_config(config)
    }
    pub fn from_config(config: Config) -> Result<Self> {
        let settings: Settings = config.try_deserialize()?;
        Ok(settings.sanitized())
    }
    // anything that is not an http(s) URL falls back to the public commons
    fn sanitized(mut self) -> Self {
        if !self.endpoint.starts_with("http") {
            warn!(endpoint = %self.endpoint, fallback = DEFAULT_ENDPOINT, "ignoring endpoint that is not an http URL");
            self.endpoint = default_endpoint();
        }
        while self.endpoint.ends_with('/') {
            self.endpoint.pop();
        }
        self
    }
    pub fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PatternqError::Config(format!("Must set {ENV_PREFIX}_API_KEY in environment to use query")))
    }
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
