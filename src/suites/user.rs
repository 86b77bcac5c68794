//! User CRUD routes

use futures_util::FutureExt;
use serde_json::json;

use super::keys::CREATED_USER;
use crate::common::Result;
use crate::http::{del, get, post, put, ApiResponse, Get, HttpClient};
use crate::schemas;
use crate::state::TestState;
use crate::testing::{
    assert_resource_deleted, assert_resource_updated, describe_rest_endpoint, save_body_to_state,
    Scenario, StepFuture, Suite,
};

const EMAIL: &str = "test@test.com";
const NAME: &str = "Test User";
const UPDATED_NAME: &str = "Updated User";

fn created_user_id(state: &TestState) -> Result<String> {
    state.segment(CREATED_USER.name(), "/id")
}

/// GET the user saved under `createdUser`
fn get_created_user(
    get_user: &Get,
) -> impl for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static {
    let get_user = get_user.clone();
    move |state| {
        let get_user = get_user.clone();
        let id = created_user_id(state);
        async move { get_user.call(&id?, None).await }.boxed()
    }
}

pub fn suite(client: &HttpClient) -> Suite {
    let post_user = post(client, "/user");
    let get_user = get(client, "/user");
    let put_user = put(client, "/user");
    let delete_user = del(client, "/user");

    let new_user = json!({ "email": EMAIL, "name": NAME });
    let update = json!({ "name": UPDATED_NAME });

    let create = {
        let body = new_user.clone();
        Scenario::new("happy path", move |_state| {
            let post_user = post_user.clone();
            let body = body.clone();
            async move { post_user.call(&body, None).await }.boxed()
        })
        .status(201)
        .body(new_user)
        .schema(schemas::user())
        .save_to_state(save_body_to_state(CREATED_USER.name()))
    };

    let list = {
        let get_user = get_user.clone();
        Scenario::new("happy path", move |_state| {
            let get_user = get_user.clone();
            async move { get_user.call("", None).await }.boxed()
        })
        .status(200)
        .schema(schemas::array_of(schemas::user()))
    };

    let fetch = Scenario::new("happy path", get_created_user(&get_user))
        .status(200)
        .schema(schemas::user())
        .body_from(|state| state.require(CREATED_USER.name()).cloned())
        .reads([CREATED_USER.name()]);

    let fetch_unknown = {
        let get_user = get_user.clone();
        Scenario::new("with unknown ID", move |_state| {
            let get_user = get_user.clone();
            async move { get_user.call("0", None).await }.boxed()
        })
        .status(404)
    };

    let update_happy = {
        let put_user = put_user.clone();
        let body = update.clone();
        Scenario::new("happy path", move |state| {
            let put_user = put_user.clone();
            let body = body.clone();
            let id = created_user_id(state);
            async move { put_user.call(&id?, &body, None).await }.boxed()
        })
        .status(200)
        .body(update.clone())
        .schema(schemas::user())
        .assertion(assert_resource_updated(
            get_created_user(&get_user),
            json!({ "email": EMAIL, "name": UPDATED_NAME }),
        ))
        .reads([CREATED_USER.name()])
    };

    let update_unknown = {
        let put_user = put_user.clone();
        Scenario::new("with non-existent user", move |_state| {
            let put_user = put_user.clone();
            let update = update.clone();
            async move { put_user.call("0", &update, None).await }.boxed()
        })
        .status(404)
    };

    let delete_happy = {
        let delete_user = delete_user.clone();
        Scenario::new("happy path", move |state| {
            let delete_user = delete_user.clone();
            let id = created_user_id(state);
            async move { delete_user.call(&id?, None).await }.boxed()
        })
        .status(204)
        .assertion(assert_resource_deleted(get_created_user(&get_user)))
        .reads([CREATED_USER.name()])
    };

    let delete_unknown = Scenario::new("with a non-existent user", move |_state| {
        let delete_user = delete_user.clone();
        async move { delete_user.call("0", None).await }.boxed()
    })
    .status(404);

    Suite::new("user").endpoints([
        describe_rest_endpoint("POST /user", vec![create]),
        describe_rest_endpoint("GET /user", vec![list]),
        describe_rest_endpoint("GET /user/:id", vec![fetch, fetch_unknown]),
        describe_rest_endpoint("PUT /user/:id", vec![update_happy, update_unknown]),
        describe_rest_endpoint("DELETE /user/:id", vec![delete_happy, delete_unknown]),
    ])
}
