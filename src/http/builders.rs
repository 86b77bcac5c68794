//! Request builders bound to a resource URL
//!
//! Each factory closes over a client and a resource path and returns a caller
//! for one HTTP method:
//!
//! ```no_run
//! # async fn demo() -> restcheck::Result<()> {
//! use restcheck::http::{get, post, HttpClient};
//! use serde_json::json;
//!
//! let client = HttpClient::new("http://localhost:3000")?;
//! let post_category = post(&client, "/category");
//! let get_category = get(&client, "/category");
//!
//! post_category.call(&json!({"name": "dairy"}), None).await?;
//! let all = get_category.call("", None).await?;
//! # Ok(())
//! # }
//! ```

use reqwest::Method;
use serde_json::Value;

use super::{ApiResponse, HttpClient, RequestOptions};
use crate::common::Result;

/// Resource URL with an optional `/id` suffix; an empty id targets the
/// collection itself
fn resource_url(base: &str, id: &str) -> String {
    if id.is_empty() {
        base.to_string()
    } else {
        format!("{}/{}", base, id)
    }
}

/// Create a POST caller for `path`
pub fn post(client: &HttpClient, path: &str) -> Post {
    Post {
        client: client.clone(),
        url: client.url(path),
    }
}

/// Create a GET caller for `path`
pub fn get(client: &HttpClient, path: &str) -> Get {
    Get {
        client: client.clone(),
        url: client.url(path),
    }
}

/// Create a PUT caller for `path`
pub fn put(client: &HttpClient, path: &str) -> Put {
    Put {
        client: client.clone(),
        url: client.url(path),
    }
}

/// Create a DELETE caller for `path`
pub fn del(client: &HttpClient, path: &str) -> Delete {
    Delete {
        client: client.clone(),
        url: client.url(path),
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    client: HttpClient,
    url: String,
}

impl Post {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, data: &Value, options: Option<&RequestOptions>) -> Result<ApiResponse> {
        self.client
            .send(Method::POST, &self.url, Some(data), options)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct Get {
    client: HttpClient,
    url: String,
}

impl Get {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, id: &str, options: Option<&RequestOptions>) -> Result<ApiResponse> {
        self.client
            .send(Method::GET, &resource_url(&self.url, id), None, options)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct Put {
    client: HttpClient,
    url: String,
}

impl Put {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(
        &self,
        id: &str,
        data: &Value,
        options: Option<&RequestOptions>,
    ) -> Result<ApiResponse> {
        self.client
            .send(Method::PUT, &resource_url(&self.url, id), Some(data), options)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct Delete {
    client: HttpClient,
    url: String,
}

impl Delete {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn call(&self, id: &str, options: Option<&RequestOptions>) -> Result<ApiResponse> {
        self.client
            .send(Method::DELETE, &resource_url(&self.url, id), None, options)
            .await
    }
}
