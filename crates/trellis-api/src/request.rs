//! # Request Context
//!
//! The dispatcher reads the incoming request once and hands handlers a
//! [`RequestContext`]: path and query parameters, the JSON body, headers,
//! and whatever middleware stored in the request extensions.
//!
//! An empty body parses as `null`. A body that is not JSON fails with
//! [`MalformedBody`] before the handler runs.

use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::{FromRequestParts, Path, Query, Request};
use axum::http::{Extensions, HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use trellis_core::AppError;

use crate::middleware::REQUEST_ID_HEADER;

/// Request body could not be turned into JSON.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedBody {
    /// Body bytes are not valid JSON.
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    /// Body could not be read, or exceeded the size limit.
    #[error("request body could not be read: {0}")]
    Unreadable(String),

    /// Body is JSON but does not match the expected shape.
    #[error("request body has an unexpected shape: {0}")]
    Shape(String),
}

/// Request summary available to error handlers.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Value of `x-request-id`, if set.
    pub request_id: Option<String>,
}

impl RequestInfo {
    /// Summary of a request's head.
    pub fn new(method: Method, uri: Uri, headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Self {
            method,
            uri,
            request_id,
        }
    }

    /// Placeholder used when the request is no longer available.
    pub fn unknown() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::from_static("/"),
            request_id: None,
        }
    }

    pub(crate) fn of(request: &Request) -> Self {
        Self::new(request.method().clone(), request.uri().clone(), request.headers())
    }
}

/// Everything a handler reads from the request.
#[derive(Debug)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Request URI.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
    /// Path parameters by name.
    pub params: HashMap<String, String>,
    /// Query parameters by name.
    pub query: HashMap<String, String>,
    /// Parsed JSON body, `null` when empty.
    pub body: Value,
    /// Values inserted by middleware.
    pub extensions: Extensions,
}

impl RequestContext {
    /// Read the request, buffering at most `body_limit` bytes of body.
    pub async fn from_request(request: Request, body_limit: usize) -> Result<Self, MalformedBody> {
        let (mut parts, body) = request.into_parts();

        let params = Path::<HashMap<String, String>>::from_request_parts(&mut parts, &())
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(query)| query)
            .unwrap_or_default();

        let bytes = axum::body::to_bytes(body, body_limit)
            .await
            .map_err(|e| MalformedBody::Unreadable(e.to_string()))?;
        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).map_err(|e| MalformedBody::InvalidJson(e.to_string()))?
        };

        Ok(Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            params,
            query,
            body,
            extensions: parts.extensions,
        })
    }

    /// Context with the given method and URI and nothing else, for tests.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            params: HashMap::new(),
            query: HashMap::new(),
            body: Value::Null,
            extensions: Extensions::new(),
        }
    }

    /// One path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Path parameter parsed as `T`; 400 when missing or unparsable.
    pub fn param_as<T: FromStr>(&self, name: &str) -> Result<T, AppError> {
        let raw = self
            .param(name)
            .ok_or_else(|| AppError::BadRequest(format!("missing path parameter '{name}'")))?;
        raw.parse()
            .map_err(|_| AppError::BadRequest(format!("invalid path parameter '{name}': {raw}")))
    }

    /// One query parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Query parameters as a JSON object, for schema `pick`/`check`.
    pub fn query_value(&self) -> Value {
        Value::Object(
            self.query
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// One header as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The JSON body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The body deserialized as `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, MalformedBody> {
        T::deserialize(&self.body).map_err(|e| MalformedBody::Shape(e.to_string()))
    }

    /// A value stored by middleware.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Summary for error handlers.
    pub fn info(&self) -> RequestInfo {
        RequestInfo::new(self.method.clone(), self.uri.clone(), &self.headers)
    }
}
