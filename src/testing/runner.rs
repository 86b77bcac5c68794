//! Scenario runner implementation
//!
//! Executes endpoints' scenarios strictly in order. Each scenario is its own
//! unit of failure containment: a failing case never stops its siblings, and a
//! failing hook only aborts the scenario it belongs to.

use std::collections::BTreeSet;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::{debug, info, info_span, warn, Instrument};

use crate::common::{Error, Result};
use crate::http::ApiResponse;
use crate::state::TestState;

use super::matching::partial_match;
use super::report::{
    CaseOutcome, CaseReport, EndpointReport, Hook, HookFailure, Reporter, ScenarioReport,
    SilentReporter, SuiteReport,
};
use super::scenario::{status_label, Scenario, BODY_LABEL, SCHEMA_LABEL};
use super::schema;

/// A labelled list of scenarios against one logical endpoint
#[derive(Debug)]
pub struct Endpoint {
    label: String,
    scenarios: Vec<Scenario>,
}

impl Endpoint {
    /// Label as reported, e.g. `"POST /login endpoint"`
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }
}

/// Describe a suite of scenarios to run against one REST endpoint
pub fn describe_rest_endpoint(label: impl Into<String>, scenarios: Vec<Scenario>) -> Endpoint {
    Endpoint {
        label: format!("{} endpoint", label.into()),
        scenarios,
    }
}

/// An ordered collection of endpoints sharing one state
#[derive(Debug)]
pub struct Suite {
    name: String,
    endpoints: Vec<Endpoint>,
    seeded: BTreeSet<String>,
    seed: Map<String, Value>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoints: Vec::new(),
            seeded: BTreeSet::new(),
            seed: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn endpoints<I: IntoIterator<Item = Endpoint>>(mut self, endpoints: I) -> Self {
        self.endpoints.extend(endpoints);
        self
    }

    /// Keys present in the state before the first scenario runs
    pub fn seeded_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seeded.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Write `value` under `key` before the first scenario runs
    pub fn seed(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        self.seeded.insert(key.clone());
        self.seed.insert(key, value);
        self
    }

    /// Append another suite's endpoints and seeds
    pub fn merge(mut self, other: Suite) -> Self {
        self.endpoints.extend(other.endpoints);
        self.seeded.extend(other.seeded);
        self.seed.extend(other.seed);
        self
    }

    pub fn endpoint_list(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn scenario_count(&self) -> usize {
        self.endpoints.iter().map(|e| e.scenarios.len()).sum()
    }

    /// Check that every declared read follows a declared write
    ///
    /// Walks scenarios in execution order. A scenario may read keys that were
    /// seeded or written by an earlier scenario; its own writes only become
    /// visible to the scenarios after it.
    pub fn validate(&self) -> Result<()> {
        self.validate_with(std::iter::empty::<String>())
    }

    /// Like `validate`, treating `known` keys as already written
    pub fn validate_with<I, S>(&self, known: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut written = self.seeded.clone();
        written.extend(known.into_iter().map(Into::into));
        for endpoint in &self.endpoints {
            for scenario in &endpoint.scenarios {
                if let Some(key) = scenario.reads.iter().find(|key| !written.contains(*key)) {
                    return Err(Error::UndeclaredStateRead {
                        endpoint: endpoint.label.clone(),
                        scenario: scenario.description.clone(),
                        key: key.clone(),
                    });
                }
                written.extend(scenario.declared_writes());
            }
        }
        Ok(())
    }
}

/// Runs suites, owning the state shared by their scenarios
pub struct Runner {
    state: TestState,
    reporter: Box<dyn Reporter>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(Box::new(SilentReporter))
    }
}

impl Runner {
    pub fn new(reporter: Box<dyn Reporter>) -> Self {
        Self {
            state: TestState::new(),
            reporter,
        }
    }

    /// Start from an existing state instead of an empty one
    pub fn with_state(mut self, state: TestState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &TestState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut TestState {
        &mut self.state
    }

    pub fn into_state(self) -> TestState {
        self.state
    }

    /// Validate and run every endpoint of `suite` in order
    pub async fn run_suite(&mut self, suite: &Suite) -> Result<SuiteReport> {
        suite.validate_with(self.state.get_all().keys().cloned())?;
        self.state
            .put_all(suite.seed.iter().map(|(k, v)| (k.clone(), v.clone())));

        let t0 = Instant::now();
        info!(suite = %suite.name, scenarios = suite.scenario_count(), "starting suite");
        self.reporter.suite_started(&suite.name);

        let mut endpoints = Vec::with_capacity(suite.endpoints.len());
        for endpoint in &suite.endpoints {
            endpoints.push(self.run_endpoint(endpoint).await);
        }

        let report = SuiteReport {
            name: suite.name.clone(),
            endpoints,
        };
        let summary = report.summary();
        info!(
            suite = %suite.name,
            passed = summary.passed,
            failed = summary.failed,
            errored = summary.errored,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "suite finished"
        );
        self.reporter.suite_finished(&report);
        Ok(report)
    }

    /// Run every scenario of one endpoint in order
    pub async fn run_endpoint(&mut self, endpoint: &Endpoint) -> EndpointReport {
        let span = info_span!("endpoint", label = %endpoint.label);
        async {
            self.reporter.endpoint_started(&endpoint.label);
            let mut scenarios = Vec::with_capacity(endpoint.scenarios.len());
            for scenario in &endpoint.scenarios {
                scenarios.push(self.run_scenario(scenario).await);
            }
            EndpointReport {
                label: endpoint.label.clone(),
                scenarios,
            }
        }
        .instrument(span)
        .await
    }

    /// Run one scenario: setup, call, cases, teardown, save
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> ScenarioReport {
        let span = info_span!("scenario", description = %scenario.description, debug = scenario.debug);
        async {
            self.reporter.scenario_started(&scenario.description);
            let labels = scenario.case_labels();

            let response = match self.call(scenario).await {
                Ok(response) => response,
                Err(failure) => return self.abort(scenario, labels, failure),
            };

            if scenario.debug {
                info!(
                    status = response.status,
                    headers = ?response.headers,
                    body = %response.body,
                    "captured response"
                );
            } else {
                debug!(status = response.status, "captured response");
            }

            let mut cases = Vec::with_capacity(labels.len());
            for (label, result) in labels.into_iter().zip(self.evaluate(scenario, &response).await) {
                let case = CaseReport {
                    label,
                    outcome: outcome_of(result),
                };
                if !case.outcome.is_passed() {
                    warn!(case = %case.label, outcome = ?case.outcome, "case did not pass");
                }
                self.reporter.case_finished(&case);
                cases.push(case);
            }

            let hook_failure = self.finish(scenario, &response).await.err();
            if let Some(failure) = &hook_failure {
                warn!(hook = %failure.hook, error = %failure.message, "hook failed");
                self.reporter.hook_failed(failure);
            }

            ScenarioReport {
                description: scenario.description.clone(),
                cases,
                hook_failure,
            }
        }
        .instrument(span)
        .await
    }

    /// Setup then call; the response lives for the rest of the scenario
    async fn call(&mut self, scenario: &Scenario) -> std::result::Result<ApiResponse, HookFailure> {
        if let Some(setup) = &scenario.setup {
            setup(&mut self.state)
                .await
                .map_err(|e| hook_failure(Hook::Setup, e))?;
        }
        (scenario.call)(&self.state)
            .await
            .map_err(|e| hook_failure(Hook::Call, e))
    }

    /// Report every case as errored after a failed setup or call
    fn abort(
        &mut self,
        scenario: &Scenario,
        labels: Vec<String>,
        failure: HookFailure,
    ) -> ScenarioReport {
        warn!(hook = %failure.hook, error = %failure.message, "scenario aborted");
        self.reporter.hook_failed(&failure);
        let message = format!("{} failed: {}", failure.hook, failure.message);
        let cases = labels
            .into_iter()
            .map(|label| {
                let case = CaseReport {
                    label,
                    outcome: CaseOutcome::Errored {
                        message: message.clone(),
                    },
                };
                self.reporter.case_finished(&case);
                case
            })
            .collect();
        ScenarioReport {
            description: scenario.description.clone(),
            cases,
            hook_failure: Some(failure),
        }
    }

    /// Evaluate every case independently, in label order
    async fn evaluate(&self, scenario: &Scenario, response: &ApiResponse) -> Vec<Result<()>> {
        let mut results = Vec::new();

        if let Some(expected) = scenario.status {
            results.push(if response.status == expected {
                Ok(())
            } else {
                Err(Error::assertion(format!(
                    "expected status {}, got {}",
                    expected, response.status
                )))
            });
        }

        if let Some(expected) = &scenario.response_body {
            results.push(expected.resolve(&self.state).and_then(|expected| {
                partial_match(&expected, &response.body).map_err(|m| Error::assertion(m.to_string()))
            }));
        }

        if let Some(schema) = &scenario.schema {
            results.push(schema::validate(schema, &response.body).and_then(|validity| {
                validity.map_err(|violations| {
                    Error::assertion(format!(
                        "body does not match schema: {}",
                        violations.join("; ")
                    ))
                })
            }));
        }

        for assertion in &scenario.assertions {
            results.push(assertion.check(response, &self.state).await);
        }

        results
    }

    /// Teardown, then save to state
    async fn finish(
        &mut self,
        scenario: &Scenario,
        response: &ApiResponse,
    ) -> std::result::Result<(), HookFailure> {
        if let Some(teardown) = &scenario.teardown {
            teardown(&mut self.state, response)
                .await
                .map_err(|e| hook_failure(Hook::Teardown, e))?;
        }
        if let Some(save) = &scenario.save_to_state {
            let value = save
                .resolve(response)
                .map_err(|e| hook_failure(Hook::SaveToState, e))?;
            debug!(key = %save.key, "saving to state");
            self.state.put(save.key.clone(), value);
        }
        Ok(())
    }
}

fn hook_failure(hook: Hook, error: Error) -> HookFailure {
    HookFailure {
        hook,
        message: error.to_string(),
    }
}

fn outcome_of(result: Result<()>) -> CaseOutcome {
    match result {
        Ok(()) => CaseOutcome::Passed,
        Err(Error::TestAssertion(message)) => CaseOutcome::Failed { message },
        Err(e) => CaseOutcome::Errored {
            message: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas;
    use crate::testing::scenario::{assert_response_length_of, Assertion, SaveToState};
    use futures_util::FutureExt;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn respond(description: &str, status: u16, body: Value) -> Scenario {
        Scenario::new(description, move |_state| {
            let response = ApiResponse::new(status, body.clone());
            async move { Ok(response) }.boxed()
        })
    }

    fn failing_call(description: &str) -> Scenario {
        Scenario::new(description, |_state| {
            async { Err(Error::Internal("connection refused".into())) }.boxed()
        })
    }

    fn user_body() -> Value {
        json!({
            "id": 1,
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "email": "a@b.com",
            "name": "A",
        })
    }

    #[tokio::test]
    async fn test_all_cases_pass() {
        let mut runner = Runner::default();
        let report = runner
            .run_scenario(
                &respond("happy path", 201, user_body())
                    .status(201)
                    .body(json!({"email": "a@b.com", "name": "A"}))
                    .schema(schemas::user()),
            )
            .await;
        assert!(report.is_success());
        assert_eq!(report.cases.len(), 3);
    }

    #[tokio::test]
    async fn test_status_case_exact_match() {
        let mut runner = Runner::default();
        let report = runner
            .run_scenario(&respond("wrong status", 200, Value::Null).status(201))
            .await;
        assert_eq!(
            report.case("responds with a 201 status code").unwrap().outcome,
            CaseOutcome::Failed {
                message: "expected status 201, got 200".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_schema_case_independent_of_body_case() {
        let mut body = user_body();
        body["password"] = json!("leaked");
        let mut runner = Runner::default();
        let report = runner
            .run_scenario(
                &respond("leaky", 201, body)
                    .status(201)
                    .body(json!({"email": "someone@else.com"}))
                    .schema(schemas::user()),
            )
            .await;
        assert!(report.case(&status_label(201)).unwrap().outcome.is_passed());
        assert!(matches!(
            report.case(BODY_LABEL).unwrap().outcome,
            CaseOutcome::Failed { .. }
        ));
        assert!(matches!(
            report.case(SCHEMA_LABEL).unwrap().outcome,
            CaseOutcome::Failed { .. }
        ));
    }

    #[tokio::test]
    async fn test_additional_assertions_are_isolated() {
        let mut runner = Runner::default();
        let report = runner
            .run_scenario(
                &respond("list", 200, json!([1, 2]))
                    .assertion(assert_response_length_of(3))
                    .assertion(assert_response_length_of(2))
                    .assertion(Assertion::new("reads state", |_response, state| {
                        let result = state.require("missing").map(|_| ());
                        async move { result }.boxed()
                    })),
            )
            .await;
        let outcomes: Vec<_> = report.cases.iter().map(|c| c.outcome.clone()).collect();
        assert!(matches!(outcomes[0], CaseOutcome::Failed { .. }));
        assert_eq!(outcomes[1], CaseOutcome::Passed);
        assert!(matches!(outcomes[2], CaseOutcome::Errored { .. }));
        assert!(report.hook_failure.is_none());
    }

    #[tokio::test]
    async fn test_save_to_state_after_teardown() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let teardown_order = Arc::clone(&order);
        let save_order = Arc::clone(&order);

        let scenario = respond("login", 200, json!({"token": "abc"}))
            .status(500)
            .teardown(move |state, response| {
                teardown_order.lock().unwrap().push("teardown");
                state.put("lastStatus", json!(response.status));
                async { Ok(()) }.boxed()
            })
            .save_to_state(SaveToState::computed("userToken", move |response| {
                save_order.lock().unwrap().push("save");
                Ok(response.body["token"].clone())
            }));

        let mut runner = Runner::default();
        let report = runner.run_scenario(&scenario).await;

        assert!(!report.is_success());
        assert!(report.hook_failure.is_none());
        assert_eq!(*order.lock().unwrap(), vec!["teardown", "save"]);
        assert_eq!(runner.state().get("userToken"), Some(&json!("abc")));
        assert_eq!(runner.state().get("lastStatus"), Some(&json!(200)));
    }

    #[tokio::test]
    async fn test_setup_runs_before_call() {
        let scenario = Scenario::new("reads setup value", |state| {
            let seen = state.get("prepared").cloned().unwrap_or(Value::Null);
            async move { Ok(ApiResponse::new(200, seen)) }.boxed()
        })
        .setup(|state| {
            state.put("prepared", json!("yes"));
            async { Ok(()) }.boxed()
        })
        .body(json!("yes"));

        let mut runner = Runner::default();
        assert!(runner.run_scenario(&scenario).await.is_success());
    }

    #[tokio::test]
    async fn test_call_failure_aborts_group_only() {
        let endpoint = describe_rest_endpoint(
            "GET /thing",
            vec![
                failing_call("broken")
                    .status(200)
                    .save_to_state(SaveToState::literal("never", json!(1))),
                respond("healthy", 200, Value::Null).status(200),
            ],
        );

        let mut runner = Runner::default();
        let report = runner.run_endpoint(&endpoint).await;

        assert_eq!(report.label, "GET /thing endpoint");
        let broken = report.scenario("broken").unwrap();
        assert_eq!(broken.hook_failure.as_ref().unwrap().hook, Hook::Call);
        assert!(matches!(
            broken.cases[0].outcome,
            CaseOutcome::Errored { .. }
        ));
        assert!(report.scenario("healthy").unwrap().is_success());
        assert!(runner.state().get("never").is_none());
    }

    #[tokio::test]
    async fn test_setup_failure_skips_call() {
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let scenario = Scenario::new("never called", move |_state| {
            *flag.lock().unwrap() = true;
            async { Ok(ApiResponse::new(200, Value::Null)) }.boxed()
        })
        .setup(|_state| async { Err(Error::Internal("seed failed".into())) }.boxed())
        .status(200);

        let mut runner = Runner::default();
        let report = runner.run_scenario(&scenario).await;
        assert_eq!(report.hook_failure.unwrap().hook, Hook::Setup);
        assert!(!*called.lock().unwrap());
    }

    #[tokio::test]
    async fn test_teardown_failure_skips_save() {
        let scenario = respond("cleanup breaks", 200, json!({"id": 1}))
            .status(200)
            .teardown(|_state, _response| {
                async { Err(Error::Internal("cleanup failed".into())) }.boxed()
            })
            .save_to_state(SaveToState::literal("saved", json!(true)));

        let mut runner = Runner::default();
        let report = runner.run_scenario(&scenario).await;
        assert!(report.case(&status_label(200)).unwrap().outcome.is_passed());
        assert_eq!(report.hook_failure.unwrap().hook, Hook::Teardown);
        assert!(runner.state().get("saved").is_none());
    }

    #[tokio::test]
    async fn test_computed_body_reads_earlier_save() {
        let suite = Suite::new("chain").endpoint(describe_rest_endpoint(
            "GET /category",
            vec![
                respond("list", 200, json!([{"id": 4, "name": "dairy"}]))
                    .save_to_state(crate::testing::save_body_to_state("allCategories")),
                respond("by id", 200, json!({"id": 4, "name": "dairy", "extra": true}))
                    .reads(["allCategories"])
                    .body_from(|state| state.lookup("allCategories", "/0").cloned()),
            ],
        ));

        let mut runner = Runner::default();
        let report = runner.run_suite(&suite).await.unwrap();
        assert!(report.is_success());
        assert_eq!(report.summary().passed, 1);
    }

    #[tokio::test]
    async fn test_suite_validation_rejects_undeclared_read() {
        let suite = Suite::new("broken").endpoint(describe_rest_endpoint(
            "GET /category/:id",
            vec![respond("happy path", 200, Value::Null).reads(["allCategories"])],
        ));

        let mut runner = Runner::default();
        let err = runner.run_suite(&suite).await.unwrap_err();
        assert!(matches!(
            err,
            Error::UndeclaredStateRead { ref key, .. } if key == "allCategories"
        ));
    }

    #[tokio::test]
    async fn test_existing_state_satisfies_reads() {
        let suite = Suite::new("inherited").endpoint(describe_rest_endpoint(
            "GET /category",
            vec![respond("happy path", 200, Value::Null).reads(["userToken"])],
        ));
        assert!(suite.validate().is_err());
        assert!(suite.validate_with(["userToken"]).is_ok());

        let mut state = TestState::new();
        state.put("userToken", json!("abc"));
        let mut runner = Runner::default().with_state(state);
        let report = runner.run_suite(&suite).await.unwrap();
        assert!(report.is_success());
    }

    #[test]
    fn test_validation_order_and_seeds() {
        let reads_first = Suite::new("order")
            .endpoint(describe_rest_endpoint(
                "A",
                vec![respond("reader", 200, Value::Null).reads(["token"])],
            ))
            .endpoint(describe_rest_endpoint(
                "B",
                vec![respond("writer", 200, Value::Null)
                    .save_to_state(SaveToState::literal("token", json!("t")))],
            ));
        assert!(reads_first.validate().is_err());

        let seeded = reads_first.seeded_keys(["token"]);
        assert!(seeded.validate().is_ok());

        let valued = Suite::new("valued")
            .seed("token", json!("t"))
            .endpoint(describe_rest_endpoint(
                "A",
                vec![respond("reader", 200, Value::Null).reads(["token"])],
            ));
        assert!(valued.validate().is_ok());

        let self_read = Suite::new("self").endpoint(describe_rest_endpoint(
            "C",
            vec![respond("reads own write", 200, Value::Null)
                .reads(["token"])
                .writes(["token"])],
        ));
        assert!(self_read.validate().is_err());
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(outcome_of(Ok(())), CaseOutcome::Passed);
        assert!(matches!(
            outcome_of(Err(Error::assertion("nope"))),
            CaseOutcome::Failed { message } if message == "nope"
        ));
        assert!(matches!(
            outcome_of(Err(Error::MissingStateKey("k".into()))),
            CaseOutcome::Errored { .. }
        ));
    }
}
