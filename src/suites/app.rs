//! General application routes

use futures_util::FutureExt;
use serde_json::json;

use super::SuiteOptions;
use crate::common::Error;
use crate::http::{get, HttpClient};
use crate::testing::{describe_rest_endpoint, Assertion, Scenario, Suite};

/// The version body must be exactly `{ "version": expected }`
fn exact_version(expected: &str) -> Assertion {
    let expected = json!({ "version": expected });
    Assertion::new("responds with only the version", move |response, _state| {
        let result = if response.body == expected {
            Ok(())
        } else {
            Err(Error::assertion(format!(
                "expected exactly {}, got {}",
                expected, response.body
            )))
        };
        async move { result }.boxed()
    })
}

pub fn suite(client: &HttpClient, options: &SuiteOptions) -> Suite {
    let healthcheck = get(client, "/healthcheck");
    let version = get(client, "/version");

    Suite::new("app")
        .endpoint(describe_rest_endpoint(
            "GET /healthcheck",
            vec![Scenario::new("happy path", move |_state| {
                let healthcheck = healthcheck.clone();
                async move { healthcheck.call("", None).await }.boxed()
            })
            .status(204)],
        ))
        .endpoint(describe_rest_endpoint(
            "GET /version",
            vec![Scenario::new("happy path", move |_state| {
                let version = version.clone();
                async move { version.call("", None).await }.boxed()
            })
            .status(200)
            .body(json!({ "version": options.expected_version }))
            .assertion(exact_version(&options.expected_version))],
        ))
}
