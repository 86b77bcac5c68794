//! restcheck - scenario-driven end-to-end tests for REST APIs
//!
//! Suites of ordered scenarios are run against a live HTTP service. Each
//! scenario issues one request, checks status, body and schema cases against
//! the captured response and saves values for the scenarios after it.

pub mod cli;
pub mod commands;
pub mod common;
pub mod http;
pub mod schemas;
pub mod state;
pub mod suites;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use state::TestState;
