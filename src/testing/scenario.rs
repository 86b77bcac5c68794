//! Scenario descriptors
//!
//! A `Scenario` describes one request against an endpoint together with the
//! expectations checked against its response and the state it hands on to
//! later scenarios. Scenarios are assembled with a builder:
//!
//! ```
//! use futures_util::FutureExt;
//! use restcheck::http::ApiResponse;
//! use restcheck::testing::{save_body_to_state, Scenario};
//! use serde_json::json;
//!
//! let scenario = Scenario::new("happy path", |_state| {
//!     async { Ok(ApiResponse::new(201, json!({"name": "dairy"}))) }.boxed()
//! })
//! .status(201)
//! .body(json!({"name": "dairy"}))
//! .save_to_state(save_body_to_state("category"));
//!
//! assert_eq!(scenario.declared_writes(), vec!["category".to_string()]);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::http::ApiResponse;
use crate::state::TestState;

/// Future returned by every scenario hook
pub type StepFuture<'a, T> = BoxFuture<'a, Result<T>>;

type SetupFn = Box<dyn for<'a> Fn(&'a mut TestState) -> StepFuture<'a, ()> + Send + Sync>;
type CallFn = Box<dyn for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync>;
type TeardownFn =
    Box<dyn for<'a> Fn(&'a mut TestState, &'a ApiResponse) -> StepFuture<'a, ()> + Send + Sync>;
type CheckFn =
    Box<dyn for<'a> Fn(&'a ApiResponse, &'a TestState) -> StepFuture<'a, ()> + Send + Sync>;
type BodyFn = Box<dyn Fn(&TestState) -> Result<Value> + Send + Sync>;
type SaveFn = Box<dyn Fn(&ApiResponse) -> Result<Value> + Send + Sync>;

/// Expected response body
pub enum ExpectedBody {
    Literal(Value),
    /// Computed from the state when the case runs
    Computed(BodyFn),
}

impl ExpectedBody {
    pub fn resolve(&self, state: &TestState) -> Result<Value> {
        match self {
            Self::Literal(value) => Ok(value.clone()),
            Self::Computed(f) => f(state),
        }
    }
}

impl fmt::Debug for ExpectedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Value written to the state after a scenario
pub enum SaveValue {
    Literal(Value),
    /// Computed from the captured response
    Computed(SaveFn),
}

impl fmt::Debug for SaveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Request to save a value under `key` once the scenario finishes
#[derive(Debug)]
pub struct SaveToState {
    pub key: String,
    pub value: SaveValue,
}

impl SaveToState {
    pub fn literal(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value: SaveValue::Literal(value),
        }
    }

    pub fn computed<F>(key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ApiResponse) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            value: SaveValue::Computed(Box::new(f)),
        }
    }

    pub fn resolve(&self, response: &ApiResponse) -> Result<Value> {
        match &self.value {
            SaveValue::Literal(value) => Ok(value.clone()),
            SaveValue::Computed(f) => f(response),
        }
    }
}

/// Save the whole response body under `key`
pub fn save_body_to_state(key: impl Into<String>) -> SaveToState {
    SaveToState::computed(key, |response| Ok(response.body.clone()))
}

/// Save the body field at `pointer` under `key`
pub fn save_field_to_state(key: impl Into<String>, pointer: impl Into<String>) -> SaveToState {
    let pointer = pointer.into();
    SaveToState::computed(key, move |response| {
        response.body.pointer(&pointer).cloned().ok_or_else(|| {
            Error::assertion(format!("response body has no value at '{}'", pointer))
        })
    })
}

/// A labelled custom check, reported as its own case
pub struct Assertion {
    label: String,
    check: CheckFn,
}

impl Assertion {
    pub fn new<F>(label: impl Into<String>, check: F) -> Self
    where
        F: for<'a> Fn(&'a ApiResponse, &'a TestState) -> StepFuture<'a, ()> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            check: Box::new(check),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn check<'a>(
        &'a self,
        response: &'a ApiResponse,
        state: &'a TestState,
    ) -> StepFuture<'a, ()> {
        (self.check)(response, state)
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion").field("label", &self.label).finish()
    }
}

/// Asserts the response body is an array of `length` items
pub fn assert_response_length_of(length: usize) -> Assertion {
    Assertion::new(
        format!("response has length of {}", length),
        move |response, _state| {
            let result = match response.body.as_array() {
                Some(items) if items.len() == length => Ok(()),
                Some(items) => Err(Error::assertion(format!(
                    "expected {} items, got {}",
                    length,
                    items.len()
                ))),
                None => Err(Error::assertion(format!(
                    "expected an array body, got {}",
                    response.body
                ))),
            };
            async move { result }.boxed()
        },
    )
}

/// Asserts a follow-up GET returns a body comprising `expected`
pub fn assert_resource_updated<F>(get: F, expected: Value) -> Assertion
where
    F: for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static,
{
    Assertion::new("updates the resource as expected", move |_response, state| {
        let pending = get(state);
        let expected = expected.clone();
        async move {
            let response = pending.await?;
            super::matching::partial_match(&expected, &response.body)
                .map_err(|m| Error::assertion(format!("resource not updated: {}", m)))
        }
        .boxed()
    })
}

/// Asserts a follow-up GET reports 404
pub fn assert_resource_deleted<F>(get: F) -> Assertion
where
    F: for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static,
{
    Assertion::new("deleted the resource", move |_response, state| {
        let pending = get(state);
        async move {
            let response = pending.await?;
            if response.status == 404 {
                Ok(())
            } else {
                Err(Error::assertion(format!(
                    "expected 404 after delete, got {}",
                    response.status
                )))
            }
        }
        .boxed()
    })
}

/// One request/expectation/state-transition unit of a suite
pub struct Scenario {
    pub(crate) description: String,
    pub(crate) setup: Option<SetupFn>,
    pub(crate) call: CallFn,
    pub(crate) status: Option<u16>,
    pub(crate) response_body: Option<ExpectedBody>,
    pub(crate) schema: Option<Value>,
    pub(crate) assertions: Vec<Assertion>,
    pub(crate) teardown: Option<TeardownFn>,
    pub(crate) save_to_state: Option<SaveToState>,
    pub(crate) reads: BTreeSet<String>,
    pub(crate) writes: BTreeSet<String>,
    pub(crate) debug: bool,
}

impl Scenario {
    /// A scenario that calls the endpoint with `call`
    pub fn new<F>(description: impl Into<String>, call: F) -> Self
    where
        F: for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            setup: None,
            call: Box::new(call),
            status: None,
            response_body: None,
            schema: None,
            assertions: Vec::new(),
            teardown: None,
            save_to_state: None,
            reads: BTreeSet::new(),
            writes: BTreeSet::new(),
            debug: false,
        }
    }

    /// Run `setup` immediately before the call
    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: for<'a> Fn(&'a mut TestState) -> StepFuture<'a, ()> + Send + Sync + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Expect the body to comprise `body`
    pub fn body(mut self, body: Value) -> Self {
        self.response_body = Some(ExpectedBody::Literal(body));
        self
    }

    /// Expect the body to comprise a value computed from the state
    pub fn body_from<F>(mut self, f: F) -> Self
    where
        F: Fn(&TestState) -> Result<Value> + Send + Sync + 'static,
    {
        self.response_body = Some(ExpectedBody::Computed(Box::new(f)));
        self
    }

    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Run `teardown` once after every case, before saving to state
    pub fn teardown<F>(mut self, teardown: F) -> Self
    where
        F: for<'a> Fn(&'a mut TestState, &'a ApiResponse) -> StepFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        self.teardown = Some(Box::new(teardown));
        self
    }

    pub fn save_to_state(mut self, save: SaveToState) -> Self {
        self.save_to_state = Some(save);
        self
    }

    /// Declare state keys this scenario reads
    pub fn reads<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reads.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Declare state keys this scenario writes from setup or teardown
    pub fn writes<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.writes.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Log the full captured response for this scenario
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn declared_reads(&self) -> Vec<String> {
        self.reads.iter().cloned().collect()
    }

    /// Declared writes, including the `save_to_state` key
    pub fn declared_writes(&self) -> Vec<String> {
        let mut writes = self.writes.clone();
        if let Some(save) = &self.save_to_state {
            writes.insert(save.key.clone());
        }
        writes.into_iter().collect()
    }

    /// Labels of the cases this scenario reports, in order
    pub fn case_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        if let Some(status) = self.status {
            labels.push(status_label(status));
        }
        if self.response_body.is_some() {
            labels.push(BODY_LABEL.to_string());
        }
        if self.schema.is_some() {
            labels.push(SCHEMA_LABEL.to_string());
        }
        labels.extend(self.assertions.iter().map(|a| a.label.clone()));
        labels
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("description", &self.description)
            .field("status", &self.status)
            .field("response_body", &self.response_body)
            .field("schema", &self.schema.is_some())
            .field("assertions", &self.assertions)
            .field("save_to_state", &self.save_to_state)
            .field("reads", &self.reads)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

pub(crate) const BODY_LABEL: &str = "responds with the expected response body";
pub(crate) const SCHEMA_LABEL: &str = "responds with a body matching the defined schema";

pub(crate) fn status_label(status: u16) -> String {
    format!("responds with a {} status code", status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn respond(status: u16, body: Value) -> Scenario {
        Scenario::new("test", move |_state| {
            let response = ApiResponse::new(status, body.clone());
            async move { Ok(response) }.boxed()
        })
    }

    #[test]
    fn test_expected_body_resolution() {
        let mut state = TestState::new();
        state.put("allCategories", json!([{"id": 1, "name": "dairy"}]));

        let literal = ExpectedBody::Literal(json!({"name": "dairy"}));
        assert_eq!(literal.resolve(&state).unwrap(), json!({"name": "dairy"}));

        let computed = ExpectedBody::Computed(Box::new(|state: &TestState| {
            state.lookup("allCategories", "/0").cloned()
        }));
        assert_eq!(
            computed.resolve(&state).unwrap(),
            json!({"id": 1, "name": "dairy"})
        );

        state.clear();
        assert!(matches!(
            computed.resolve(&state),
            Err(Error::MissingStateKey(_))
        ));
    }

    #[test]
    fn test_save_to_state_resolution() {
        let response = ApiResponse::new(200, json!({"token": "abc"}));
        assert_eq!(
            SaveToState::literal("flag", json!(true))
                .resolve(&response)
                .unwrap(),
            json!(true)
        );
        assert_eq!(
            save_body_to_state("body").resolve(&response).unwrap(),
            json!({"token": "abc"})
        );
        assert_eq!(
            save_field_to_state("userToken", "/token")
                .resolve(&response)
                .unwrap(),
            json!("abc")
        );
        assert!(save_field_to_state("userToken", "/missing")
            .resolve(&response)
            .is_err());
    }

    #[test]
    fn test_declared_keys() {
        let scenario = respond(200, json!({}))
            .reads(["userToken"])
            .writes(["scratch"])
            .save_to_state(save_body_to_state("allCategories"));
        assert_eq!(scenario.declared_reads(), vec!["userToken"]);
        assert_eq!(scenario.declared_writes(), vec!["allCategories", "scratch"]);
    }

    #[test]
    fn test_case_labels_follow_configuration() {
        let scenario = respond(201, json!({}))
            .status(201)
            .body(json!({}))
            .schema(json!({"type": "object"}))
            .assertion(assert_response_length_of(2));
        assert_eq!(
            scenario.case_labels(),
            vec![
                "responds with a 201 status code",
                "responds with the expected response body",
                "responds with a body matching the defined schema",
                "response has length of 2",
            ]
        );
        assert!(respond(204, Value::Null).case_labels().is_empty());
    }

    #[tokio::test]
    async fn test_length_assertion() {
        let state = TestState::new();
        let assertion = assert_response_length_of(2);
        let ok = ApiResponse::new(200, json!([1, 2]));
        let short = ApiResponse::new(200, json!([1]));
        let object = ApiResponse::new(200, json!({}));
        assert!(assertion.check(&ok, &state).await.is_ok());
        assert!(assertion.check(&short, &state).await.unwrap_err().is_assertion());
        assert!(assertion.check(&object, &state).await.unwrap_err().is_assertion());
    }

    #[tokio::test]
    async fn test_resource_assertions_use_follow_up_request() {
        let state = TestState::new();
        let unused = ApiResponse::new(200, Value::Null);

        let updated = assert_resource_updated(
            |_state| async { Ok(ApiResponse::new(200, json!({"id": 1, "name": "Dairy"}))) }.boxed(),
            json!({"name": "Dairy"}),
        );
        assert!(updated.check(&unused, &state).await.is_ok());

        let stale = assert_resource_updated(
            |_state| async { Ok(ApiResponse::new(200, json!({"id": 1, "name": "dairy"}))) }.boxed(),
            json!({"name": "Dairy"}),
        );
        assert!(stale.check(&unused, &state).await.unwrap_err().is_assertion());

        let deleted = assert_resource_deleted(|_state| {
            async { Ok(ApiResponse::new(404, Value::Null)) }.boxed()
        });
        assert!(deleted.check(&unused, &state).await.is_ok());

        let still_there = assert_resource_deleted(|_state| {
            async { Ok(ApiResponse::new(200, json!({"id": 1}))) }.boxed()
        });
        assert!(still_there
            .check(&unused, &state)
            .await
            .unwrap_err()
            .is_assertion());
    }
}
