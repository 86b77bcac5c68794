//! Error types for restcheck
//!
//! Every failure a scenario can hit maps onto one of these variants. The
//! runner uses the variant to decide how a case is reported: assertion
//! mismatches are `failed`, everything else is `errored`.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for restcheck
#[derive(Error, Debug)]
pub enum Error {
    // === HTTP Errors ===
    #[error("HTTP {method} {url} failed: {source}")]
    Http {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    // === State Errors ===
    #[error("State key '{0}' has not been written. Save it from an earlier scenario before reading it")]
    MissingStateKey(String),

    #[error("State key '{key}' has no value at '{pointer}'")]
    MissingStatePath { key: String, pointer: String },

    #[error("State key '{key}' holds an unexpected value: {reason}")]
    StateType { key: String, reason: String },

    // === Suite Errors ===
    #[error("Scenario '{scenario}' of '{endpoint}' reads state key '{key}' before any earlier scenario writes it")]
    UndeclaredStateRead {
        endpoint: String,
        scenario: String,
        key: String,
    },

    #[error("Unknown suite '{name}'. Available: {available}")]
    UnknownSuite { name: String, available: String },

    #[error("Invalid JSON schema: {0}")]
    InvalidSchema(String),

    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid scenario file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Test Errors ===
    #[error("Test assertion failed: {0}")]
    TestAssertion(String),

    // === Internal Errors ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an HTTP transport error for the given request
    pub fn http(method: &reqwest::Method, url: &str, source: reqwest::Error) -> Self {
        Self::Http {
            method: method.to_string(),
            url: url.to_string(),
            source,
        }
    }

    /// Create an invalid header error
    pub fn invalid_header(name: &str, reason: impl ToString) -> Self {
        Self::InvalidHeader {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a missing state path error
    pub fn missing_state_path(key: &str, pointer: &str) -> Self {
        Self::MissingStatePath {
            key: key.to_string(),
            pointer: pointer.to_string(),
        }
    }

    /// Create an assertion failure
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::TestAssertion(message.into())
    }

    /// Whether this error is an expectation mismatch rather than a broken run
    pub fn is_assertion(&self) -> bool {
        matches!(self, Self::TestAssertion(_))
    }
}
