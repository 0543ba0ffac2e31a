use thiserror::Error;

#[derive(Error, Debug)]
pub enum PatternqError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Missing column: {0}")]
    MissingColumn(String),
    #[error("Shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch { context: String, expected: &'static str, found: &'static str },
    #[error("Name collision: '{first}' and '{second}' both normalize to '{normalized}'")]
    NameCollision { first: String, second: String, normalized: String },
    #[error("Service error: HTTP {status}: {message}")]
    Service { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, PatternqError>;

impl PatternqError {
    pub(crate) fn shape(context: impl Into<String>, expected: &'static str, found: &serde_json::Value) -> Self {
        Self::ShapeMismatch { context: context.into(), expected, found: shape_of(found) }
    }
}

/// Short name of a value's variant, used in shape mismatch messages.
pub fn shape_of(value: &serde_json::Value) -> &'static str {
    use serde_json::Value;
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}

// Helper conversions
impl From<reqwest::Error> for PatternqError {
    fn from(e: reqwest::Error) -> Self { Self::Transport(e.to_string()) }
}
impl From<serde_json::Error> for PatternqError {
    fn from(e: serde_json::Error) -> Self { Self::Decode(e.to_string()) }
}
impl From<std::io::Error> for PatternqError {
    fn from(e: std::io::Error) -> Self { Self::Decode(e.to_string()) }
}
impl From<::config::ConfigError> for PatternqError {
    fn from(e: ::config::ConfigError) -> Self { Self::Config(e.to_string()) }
}
