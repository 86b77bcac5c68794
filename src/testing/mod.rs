//! Scenario-driven API testing
//!
//! Suites are ordered lists of endpoints, each an ordered list of scenarios.
//! A scenario issues one request, checks the response against its cases and
//! hands values on to later scenarios through the shared `TestState`. Suites
//! are assembled either with the builder API or from YAML files.

mod config;
mod matching;
mod report;
mod runner;
mod scenario;
mod schema;
mod template;

pub use config::*;
pub use matching::{partial_match, Mismatch};
pub use report::{
    CaseOutcome, CaseReport, ConsoleReporter, EndpointReport, Hook, HookFailure, Reporter,
    ScenarioReport, SilentReporter, Summary, SuiteReport,
};
pub use runner::{describe_rest_endpoint, Endpoint, Runner, Suite};
pub use scenario::{
    assert_resource_deleted, assert_resource_updated, assert_response_length_of,
    save_body_to_state, save_field_to_state, Assertion, ExpectedBody, SaveToState, SaveValue,
    Scenario, StepFuture,
};
pub use schema::{compile as compile_schema, validate as validate_schema};
pub use template::Templates;
