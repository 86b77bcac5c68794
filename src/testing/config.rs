//! Scenario file configuration types
//!
//! Defines the data structures for deserializing YAML suite files and
//! compiles them into the same `Suite` the Rust builder API produces.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use futures_util::FutureExt;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;

use crate::common::{Error, Result};
use crate::http::{with_authorization, ApiResponse, HttpClient, RequestOptions};
use crate::schemas;
use crate::state::TestState;

use super::runner::{describe_rest_endpoint, Suite};
use super::scenario::{
    assert_resource_deleted, assert_resource_updated, assert_response_length_of,
    save_body_to_state, SaveToState, Scenario, StepFuture,
};
use super::schema;
use super::template::Templates;

/// A complete suite loaded from a YAML file
#[derive(Deserialize, Debug)]
pub struct SuiteFile {
    /// Name of the suite
    pub name: String,
    /// Optional description of what the suite covers
    pub description: Option<String>,
    /// State entries written before the first scenario runs
    #[serde(default)]
    pub seed: BTreeMap<String, Value>,
    /// Endpoints, run in order
    pub endpoints: Vec<EndpointSpec>,
}

/// A labelled list of scenarios against one endpoint
#[derive(Deserialize, Debug)]
pub struct EndpointSpec {
    /// Label, e.g. "POST /category"
    pub label: String,
    pub scenarios: Vec<ScenarioSpec>,
}

/// One scenario of an endpoint
#[derive(Deserialize, Debug)]
pub struct ScenarioSpec {
    pub description: String,
    /// Requests sent before the call, in order
    #[serde(default)]
    pub setup: Vec<SetupStep>,
    /// The request under test
    pub request: RequestSpec,
    /// Expectations checked against the response
    #[serde(default)]
    pub expect: ExpectSpec,
    /// Value saved to the state once the scenario finishes
    pub save: Option<SaveSpec>,
    /// State keys read, in addition to those referenced by templates
    #[serde(default)]
    pub reads: Vec<String>,
    /// State keys written, in addition to `save` and setup saves
    #[serde(default)]
    pub writes: Vec<String>,
    /// Log the full captured response
    #[serde(default)]
    pub debug: bool,
}

/// A setup request, optionally saving part of its response
#[derive(Deserialize, Debug, Clone)]
pub struct SetupStep {
    #[serde(flatten)]
    pub request: RequestSpec,
    pub save: Option<SaveSpec>,
}

/// An HTTP request with templated path, headers and body
#[derive(Deserialize, Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method (default: GET)
    #[serde(default = "default_method")]
    pub method: String,
    /// Path relative to the base URL
    pub path: String,
    /// JSON body
    pub body: Option<Value>,
    /// Extra headers
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// State key holding a bearer token
    pub auth: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Expectations for a response
#[derive(Deserialize, Debug, Default)]
pub struct ExpectSpec {
    /// Exact status code
    pub status: Option<u16>,
    /// Body the response must comprise
    pub body: Option<Value>,
    /// Expected body read from the state, as `key/json/pointer`
    pub body_from_state: Option<String>,
    /// Schema the body must match
    pub schema: Option<SchemaSpec>,
    /// Expected array length
    pub length: Option<usize>,
    /// Follow-up request whose body must comprise the given value
    pub updated: Option<FollowUpSpec>,
    /// Follow-up request that must report 404
    pub deleted: Option<RequestSpec>,
}

/// A built-in schema name, an array of another schema, or an inline schema
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum SchemaSpec {
    Named(String),
    ArrayOf { array_of: Box<SchemaSpec> },
    Inline(Value),
}

impl SchemaSpec {
    /// Resolve to a JSON schema document
    pub fn resolve(&self) -> Result<Value> {
        match self {
            Self::Named(name) => schemas::named(name)
                .ok_or_else(|| Error::Config(format!("unknown schema '{}'", name))),
            Self::ArrayOf { array_of } => Ok(schemas::array_of(array_of.resolve()?)),
            Self::Inline(schema) => Ok(schema.clone()),
        }
    }
}

/// A follow-up request and the body it must comprise
#[derive(Deserialize, Debug, Clone)]
pub struct FollowUpSpec {
    pub request: RequestSpec,
    pub body: Value,
}

/// Where a saved value comes from
#[derive(Deserialize, Debug, Clone)]
pub struct SaveSpec {
    /// State key to write
    pub key: String,
    /// JSON pointer into `{status, headers, body}`; the body when absent
    pub from: Option<String>,
    /// Literal value to save instead
    pub value: Option<Value>,
}

impl SaveSpec {
    fn to_save(&self) -> Result<SaveToState> {
        match (&self.from, &self.value) {
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "save '{}' sets both 'from' and 'value'",
                self.key
            ))),
            (None, Some(value)) => Ok(SaveToState::literal(&self.key, value.clone())),
            (None, None) => Ok(save_body_to_state(&self.key)),
            (Some(pointer), None) => {
                let pointer = pointer.clone();
                Ok(SaveToState::computed(&self.key, move |response| {
                    response
                        .to_value()
                        .pointer(&pointer)
                        .cloned()
                        .ok_or_else(|| {
                            Error::assertion(format!("response has no value at '{}'", pointer))
                        })
                }))
            }
        }
    }

    fn save_into(&self, state: &mut TestState, response: &ApiResponse) -> Result<()> {
        let value = self.to_save()?.resolve(response)?;
        state.put(&self.key, value);
        Ok(())
    }
}

/// A request with every template rendered, ready to send
#[derive(Debug)]
struct PreparedRequest {
    method: Method,
    url: String,
    body: Option<Value>,
    options: RequestOptions,
}

impl PreparedRequest {
    async fn send(&self, client: &HttpClient) -> Result<ApiResponse> {
        client
            .send(
                self.method.clone(),
                &self.url,
                self.body.as_ref(),
                Some(&self.options),
            )
            .await
    }
}

impl RequestSpec {
    fn method(&self) -> Result<Method> {
        Method::from_bytes(self.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::Config(format!("invalid HTTP method '{}'", self.method)))
    }

    /// Render against the state
    fn prepare(
        &self,
        client: &HttpClient,
        templates: &Templates,
        state: &TestState,
    ) -> Result<PreparedRequest> {
        let mut options = match &self.auth {
            Some(key) => with_authorization(state, key)?,
            None => RequestOptions::new(),
        };
        for (name, value) in &self.headers {
            options = options.header(name, templates.render(value, state)?);
        }
        let body = self
            .body
            .as_ref()
            .map(|body| templates.render_value(body, state))
            .transpose()?;
        Ok(PreparedRequest {
            method: self.method()?,
            url: client.url(&templates.render(&self.path, state)?),
            body,
            options,
        })
    }

    /// Render and send in one step
    async fn send(
        &self,
        client: &HttpClient,
        templates: &Templates,
        state: &TestState,
    ) -> Result<ApiResponse> {
        self.prepare(client, templates, state)?.send(client).await
    }

    /// State keys this request reads
    fn reads(&self, templates: &Templates) -> Result<BTreeSet<String>> {
        let mut keys = templates.variables(&self.path)?;
        for value in self.headers.values() {
            keys.extend(templates.variables(value)?);
        }
        if let Some(body) = &self.body {
            keys.extend(templates.value_variables(body)?);
        }
        keys.extend(self.auth.iter().cloned());
        Ok(keys)
    }

    /// A caller usable as a scenario call or a follow-up GET
    fn caller(
        &self,
        client: &HttpClient,
        templates: &Templates,
    ) -> impl for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static {
        let request = self.clone();
        let client = client.clone();
        let templates = templates.clone();
        move |state: &TestState| {
            let prepared = request.prepare(&client, &templates, state);
            let client = client.clone();
            async move { prepared?.send(&client).await }.boxed()
        }
    }
}

/// Split `key/json/pointer` into the state key and a JSON pointer
fn split_state_path(path: &str) -> (String, String) {
    match path.split_once('/') {
        Some((key, rest)) => (key.to_string(), format!("/{}", rest)),
        None => (path.to_string(), String::new()),
    }
}

impl SuiteFile {
    /// Load a suite file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse a suite file from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Compile into a runnable suite against `client`
    pub fn into_suite(self, client: &HttpClient) -> Result<Suite> {
        let templates = Templates::new();
        let mut suite = Suite::new(self.name);
        for (key, value) in self.seed {
            suite = suite.seed(key, value);
        }
        for endpoint in self.endpoints {
            let scenarios = endpoint
                .scenarios
                .into_iter()
                .map(|spec| compile_scenario(spec, client, &templates))
                .collect::<Result<Vec<_>>>()?;
            suite = suite.endpoint(describe_rest_endpoint(endpoint.label, scenarios));
        }
        Ok(suite)
    }
}

fn compile_scenario(
    spec: ScenarioSpec,
    client: &HttpClient,
    templates: &Templates,
) -> Result<Scenario> {
    spec.request.method()?;
    let mut reads = spec.request.reads(templates)?;
    let mut setup_reads = BTreeSet::new();
    let mut setup_writes = BTreeSet::new();

    let mut scenario = Scenario::new(spec.description, spec.request.caller(client, templates))
        .debug(spec.debug);

    if !spec.setup.is_empty() {
        for step in &spec.setup {
            step.request.method()?;
            setup_reads.extend(
                step.request
                    .reads(templates)?
                    .into_iter()
                    .filter(|key| !setup_writes.contains(key)),
            );
            if let Some(save) = &step.save {
                save.to_save()?;
                setup_writes.insert(save.key.clone());
            }
        }
        let steps = spec.setup.clone();
        let client = client.clone();
        let templates = templates.clone();
        scenario = scenario.setup(move |state| {
            let steps = steps.clone();
            let client = client.clone();
            let templates = templates.clone();
            async move {
                for step in &steps {
                    let response = step.request.send(&client, &templates, state).await?;
                    if !(200..300).contains(&response.status) {
                        return Err(Error::assertion(format!(
                            "setup request {} {} returned {}",
                            step.request.method, step.request.path, response.status
                        )));
                    }
                    if let Some(save) = &step.save {
                        save.save_into(state, &response)?;
                    }
                }
                Ok(())
            }
            .boxed()
        });
    }

    let expect = spec.expect;
    if let Some(status) = expect.status {
        scenario = scenario.status(status);
    }

    match (expect.body, expect.body_from_state) {
        (Some(_), Some(_)) => {
            return Err(Error::Config(format!(
                "scenario '{}' sets both 'body' and 'body_from_state'",
                scenario.description()
            )))
        }
        (Some(body), None) if Templates::value_has_templates(&body) => {
            reads.extend(templates.value_variables(&body)?);
            let templates = templates.clone();
            scenario = scenario.body_from(move |state| templates.render_value(&body, state));
        }
        (Some(body), None) => scenario = scenario.body(body),
        (None, Some(path)) => {
            let (key, pointer) = split_state_path(&path);
            reads.insert(key.clone());
            scenario = scenario.body_from(move |state| state.lookup(&key, &pointer).cloned());
        }
        (None, None) => {}
    }

    if let Some(schema_spec) = &expect.schema {
        let resolved = schema_spec.resolve()?;
        schema::compile(&resolved)?;
        scenario = scenario.schema(resolved);
    }

    if let Some(length) = expect.length {
        scenario = scenario.assertion(assert_response_length_of(length));
    }

    if let Some(updated) = expect.updated {
        updated.request.method()?;
        reads.extend(updated.request.reads(templates)?);
        scenario = scenario.assertion(assert_resource_updated(
            updated.request.caller(client, templates),
            updated.body,
        ));
    }

    if let Some(deleted) = expect.deleted {
        deleted.method()?;
        reads.extend(deleted.reads(templates)?);
        scenario = scenario.assertion(assert_resource_deleted(deleted.caller(client, templates)));
    }

    if let Some(save) = &spec.save {
        scenario = scenario.save_to_state(save.to_save()?);
    }

    // Keys written by this scenario's own setup are not reads of earlier state
    reads.retain(|key| !setup_writes.contains(key));
    reads.extend(setup_reads);
    reads.extend(spec.reads);
    setup_writes.extend(spec.writes);
    Ok(scenario.reads(reads).writes(setup_writes))
}
