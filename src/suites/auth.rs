//! Registration and login routes

use futures_util::FutureExt;
use serde_json::{json, Value};

use super::keys::{AUTHORIZED_TEST_USER, USER_TOKEN};
use crate::http::{post, HttpClient, Post};
use crate::testing::{
    describe_rest_endpoint, save_body_to_state, save_field_to_state, Scenario, Suite,
};
use crate::schemas;

const EMAIL: &str = "authorized@user.com";
const PASSWORD: &str = "P@$$w0rd";
const NAME: &str = "Authorized Test User";

/// Scenario posting a fixed body
fn posting(description: &str, caller: &Post, body: Value) -> Scenario {
    let caller = caller.clone();
    Scenario::new(description, move |_state| {
        let caller = caller.clone();
        let body = body.clone();
        async move { caller.call(&body, None).await }.boxed()
    })
}

pub fn suite(client: &HttpClient) -> Suite {
    let register = post(client, "/auth/register");
    let login = post(client, "/auth/login");
    let new_user = json!({ "email": EMAIL, "name": NAME });

    Suite::new("auth")
        .endpoint(describe_rest_endpoint(
            "POST /register",
            vec![posting(
                "happy path",
                &register,
                json!({ "email": EMAIL, "name": NAME, "password": PASSWORD }),
            )
            .status(201)
            .body(new_user)
            .schema(schemas::user())
            .save_to_state(save_body_to_state(AUTHORIZED_TEST_USER.name()))],
        ))
        .endpoint(describe_rest_endpoint(
            "POST /login",
            vec![
                posting(
                    "happy path",
                    &login,
                    json!({ "email": EMAIL, "password": PASSWORD }),
                )
                .status(200)
                .schema(schemas::token())
                .save_to_state(save_field_to_state(USER_TOKEN.name(), "/token")),
                posting(
                    "incorrect user",
                    &login,
                    json!({ "email": "not@valid.com", "password": PASSWORD }),
                )
                .status(401),
                posting(
                    "incorrect password",
                    &login,
                    json!({ "email": EMAIL, "password": "not_valid" }),
                )
                .status(401),
            ],
        ))
}
