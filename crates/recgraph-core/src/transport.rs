//! Contract for the HTTP layer.
//!
//! The runtime issues requests through a [`Transport`] and never inspects
//! connection details. Retries and status classification belong to the
//! implementation.

use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

#[async_trait]
pub trait Transport: fmt::Debug + Send + Sync + 'static {
    /// Perform a request.
    ///
    /// Statuses listed in [`Request::expected_status`] must be returned as an
    /// `Ok` response rather than an error.
    async fn request(&self, request: Request) -> Result<Response>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,

    /// Non-2xx statuses the caller handles itself
    pub expected_status: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub data: Value,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Request {
        Request {
            method: Method::Get,
            url: url.into(),
            body: None,
            expected_status: vec![],
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Request {
        Request {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
            expected_status: vec![],
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Request {
        Request {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
            expected_status: vec![],
        }
    }

    pub fn expect_status(mut self, status: u16) -> Request {
        self.expected_status.push(status);
        self
    }
}

impl Response {
    pub fn ok(data: Value) -> Response {
        Response { status: 200, data }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}
