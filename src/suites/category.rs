//! Category CRUD routes, authenticated with the login token

use futures_util::FutureExt;
use serde_json::{json, Value};

use super::keys::{ALL_CATEGORIES, USER_TOKEN};
use crate::common::Result;
use crate::http::{
    del, get, post, put, with_authorization, ApiResponse, Delete, Get, HttpClient, Post, Put,
    RequestOptions,
};
use crate::schemas;
use crate::state::TestState;
use crate::testing::{
    assert_resource_deleted, assert_resource_updated, assert_response_length_of,
    describe_rest_endpoint, save_body_to_state, Scenario, StepFuture, Suite,
};

/// Which category a request targets
#[derive(Debug, Clone, Copy)]
enum Target {
    /// First entry of `allCategories`
    First,
    /// An id the API never hands out
    Unknown,
}

impl Target {
    fn id(self, state: &TestState) -> Result<String> {
        match self {
            Self::First => state.segment(ALL_CATEGORIES.name(), "/0/id"),
            Self::Unknown => Ok("0".to_string()),
        }
    }

    fn reads(self) -> Vec<&'static str> {
        match self {
            Self::First => vec![USER_TOKEN.name(), ALL_CATEGORIES.name()],
            Self::Unknown => vec![USER_TOKEN.name()],
        }
    }
}

fn with_user(state: &TestState) -> Result<RequestOptions> {
    with_authorization(state, USER_TOKEN.name())
}

fn posting(
    caller: &Post,
    body: Value,
) -> impl for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static {
    let caller = caller.clone();
    move |state| {
        let caller = caller.clone();
        let body = body.clone();
        let auth = with_user(state);
        async move { caller.call(&body, Some(&auth?)).await }.boxed()
    }
}

/// Setup hook creating another category; the response is not checked
fn adding(
    caller: &Post,
    body: Value,
) -> impl for<'a> Fn(&'a mut TestState) -> StepFuture<'a, ()> + Send + Sync + 'static {
    let caller = caller.clone();
    move |state| {
        let caller = caller.clone();
        let body = body.clone();
        let auth = with_user(state);
        async move {
            caller.call(&body, Some(&auth?)).await?;
            Ok(())
        }
        .boxed()
    }
}

fn getting(
    caller: &Get,
    target: Option<Target>,
) -> impl for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static {
    let caller = caller.clone();
    move |state| {
        let caller = caller.clone();
        let id = target.map_or_else(|| Ok(String::new()), |t| t.id(state));
        let auth = with_user(state);
        async move { caller.call(&id?, Some(&auth?)).await }.boxed()
    }
}

fn putting(
    caller: &Put,
    target: Target,
    body: Value,
) -> impl for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static {
    let caller = caller.clone();
    move |state| {
        let caller = caller.clone();
        let body = body.clone();
        let id = target.id(state);
        let auth = with_user(state);
        async move { caller.call(&id?, &body, Some(&auth?)).await }.boxed()
    }
}

fn deleting(
    caller: &Delete,
    target: Target,
) -> impl for<'a> Fn(&'a TestState) -> StepFuture<'a, ApiResponse> + Send + Sync + 'static {
    let caller = caller.clone();
    move |state| {
        let caller = caller.clone();
        let id = target.id(state);
        let auth = with_user(state);
        async move { caller.call(&id?, Some(&auth?)).await }.boxed()
    }
}

pub fn suite(client: &HttpClient) -> Suite {
    let post_category = post(client, "/category");
    let get_category = get(client, "/category");
    let put_category = put(client, "/category");
    let delete_category = del(client, "/category");

    let new_category = json!({ "name": "dairy" });
    let additional_category = json!({ "name": "Bakery" });
    let updated_category = json!({ "name": "Dairy" });

    let create = vec![
        Scenario::new("happy path", posting(&post_category, new_category.clone()))
            .status(201)
            .body(new_category.clone())
            .schema(schemas::category())
            .reads(Target::Unknown.reads()),
        Scenario::new(
            "with existing category",
            posting(&post_category, new_category),
        )
        .status(409)
        .reads(Target::Unknown.reads()),
        Scenario::new("with no name", posting(&post_category, json!({})))
            .status(400)
            .reads(Target::Unknown.reads()),
    ];

    let list = vec![
        Scenario::new("happyPath", getting(&get_category, None))
            .status(200)
            .schema(schemas::array_of(schemas::category()))
            .assertion(assert_response_length_of(1))
            .reads(Target::Unknown.reads()),
        Scenario::new("with multiple categories", getting(&get_category, None))
            .setup(adding(&post_category, additional_category.clone()))
            .status(200)
            .schema(schemas::array_of(schemas::category()))
            .assertion(assert_response_length_of(2))
            .save_to_state(save_body_to_state(ALL_CATEGORIES.name()))
            .reads(Target::Unknown.reads()),
    ];

    let fetch = vec![
        Scenario::new("happy path", getting(&get_category, Some(Target::First)))
            .status(200)
            .schema(schemas::category())
            .body_from(|state| state.lookup(ALL_CATEGORIES.name(), "/0").cloned())
            .reads(Target::First.reads()),
        Scenario::new(
            "with unknown ID",
            getting(&get_category, Some(Target::Unknown)),
        )
        .status(404)
        .reads(Target::Unknown.reads()),
    ];

    let update = vec![
        Scenario::new(
            "happy path",
            putting(&put_category, Target::First, updated_category.clone()),
        )
        .status(200)
        .body(updated_category.clone())
        .schema(schemas::category())
        .assertion(assert_resource_updated(
            getting(&get_category, Some(Target::First)),
            updated_category.clone(),
        ))
        .reads(Target::First.reads()),
        Scenario::new(
            "with updating to a conflicting name",
            putting(&put_category, Target::First, additional_category),
        )
        .status(409)
        .reads(Target::First.reads()),
        Scenario::new(
            "with non-existent category",
            putting(&put_category, Target::Unknown, updated_category),
        )
        .status(404)
        .reads(Target::Unknown.reads()),
    ];

    let delete = vec![
        Scenario::new("happy path", deleting(&delete_category, Target::First))
            .status(204)
            .assertion(assert_resource_deleted(getting(
                &get_category,
                Some(Target::First),
            )))
            .reads(Target::First.reads()),
        Scenario::new(
            "with a non-existent category",
            deleting(&delete_category, Target::Unknown),
        )
        .status(404)
        .reads(Target::Unknown.reads()),
    ];

    Suite::new("category").endpoints([
        describe_rest_endpoint("POST /category", create),
        describe_rest_endpoint("GET /category", list),
        describe_rest_endpoint("GET /category/:id", fetch),
        describe_rest_endpoint("PUT /category/:id", update),
        describe_rest_endpoint("DELETE /category/:id", delete),
    ])
}
