//! Built-in suites for the reference REST API
//!
//! Each module describes the scenarios for one group of routes. They share
//! state through the keys in [`keys`], so they must run in the order of
//! [`NAMES`]: `auth` saves the token that `category` authenticates with.

pub mod app;
pub mod auth;
pub mod category;
pub mod user;

use crate::common::config::SuitesConfig;
use crate::common::{Error, Result};
use crate::http::HttpClient;
use crate::testing::Suite;

/// Built-in suites in execution order
pub const NAMES: [&str; 4] = ["app", "auth", "user", "category"];

/// State keys shared between suites
pub mod keys {
    use serde_json::Value;

    use crate::state::StateKey;

    /// User created by `POST /auth/register`
    pub const AUTHORIZED_TEST_USER: StateKey<Value> = StateKey::new("authorizedTestUser");
    /// Bearer token from `POST /auth/login`
    pub const USER_TOKEN: StateKey<String> = StateKey::new("userToken");
    /// User created by `POST /user`
    pub const CREATED_USER: StateKey<Value> = StateKey::new("createdUser");
    /// Category listing captured by `GET /category`
    pub const ALL_CATEGORIES: StateKey<Vec<Value>> = StateKey::new("allCategories");
}

/// Options the built-in suites are parameterized by
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Version `GET /version` must report
    pub expected_version: String,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self::from(&SuitesConfig::default())
    }
}

impl From<&SuitesConfig> for SuiteOptions {
    fn from(config: &SuitesConfig) -> Self {
        Self {
            expected_version: config.expected_version.clone(),
        }
    }
}

/// Build one built-in suite by name
pub fn suite(name: &str, client: &HttpClient, options: &SuiteOptions) -> Result<Suite> {
    match name {
        "app" => Ok(app::suite(client, options)),
        "auth" => Ok(auth::suite(client)),
        "user" => Ok(user::suite(client)),
        "category" => Ok(category::suite(client)),
        other => Err(Error::UnknownSuite {
            name: other.to_string(),
            available: NAMES.join(", "),
        }),
    }
}

/// Build the named suites as one, in execution order
///
/// Unknown names are rejected; an empty list selects every suite. Duplicates
/// are collapsed.
pub fn build<S: AsRef<str>>(
    names: &[S],
    client: &HttpClient,
    options: &SuiteOptions,
) -> Result<Suite> {
    for name in names {
        if !NAMES.contains(&name.as_ref()) {
            return Err(Error::UnknownSuite {
                name: name.as_ref().to_string(),
                available: NAMES.join(", "),
            });
        }
    }

    let selected: Vec<&str> = NAMES
        .iter()
        .copied()
        .filter(|name| names.is_empty() || names.iter().any(|n| n.as_ref() == *name))
        .collect();

    let mut combined = Suite::new(selected.join(", "));
    for name in selected {
        combined = combined.merge(suite(name, client, options)?);
    }
    Ok(combined)
}

/// Every built-in suite
pub fn all(client: &HttpClient, options: &SuiteOptions) -> Result<Suite> {
    build::<&str>(&[], client, options)
}
