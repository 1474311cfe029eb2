//! Remote transport abstraction and auth token handling.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Header carrying the session token on authenticated requests.
pub const AUTH_HEADER: &str = "X-Auth-Token";

/// HTTP methods used by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PUT.
    Put,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        write!(f, "{name}")
    }
}

/// A response from the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse<B> {
    /// HTTP status code.
    pub status: u16,
    /// Response body, absent when the server returned nothing.
    pub body: Option<B>,
}

impl<B> HttpResponse<B> {
    /// Creates a 200 response with a body.
    pub fn ok(body: B) -> Self {
        Self {
            status: 200,
            body: Some(body),
        }
    }

    /// Creates a response with a status and no body.
    pub fn empty(status: u16) -> Self {
        Self { status, body: None }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Replaces the body, keeping the status.
    pub fn with_body<T>(self, body: Option<T>) -> HttpResponse<T> {
        HttpResponse {
            status: self.status,
            body,
        }
    }
}

/// A remote transport handles HTTP communication with the API server.
///
/// This trait abstracts the HTTP layer so different client libraries
/// (or an in-process loopback for tests) can be plugged in. Bodies are
/// JSON values; headers are plain name-value pairs.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Sends a GET request.
    async fn get(&self, url: &str, headers: &[(String, String)])
        -> EngineResult<HttpResponse<Value>>;

    /// Sends a POST request with a JSON body.
    async fn post(
        &self,
        url: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>>;

    /// Sends a PUT request with a JSON body.
    async fn put(
        &self,
        url: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>>;

    /// Sends a PATCH request with a JSON body.
    async fn patch(
        &self,
        url: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>>;

    /// Sends a DELETE request.
    async fn delete(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>>;
}

/// A shared handle to the current session token.
///
/// Requests carry [`AUTH_HEADER`] while a token is set and omit it
/// otherwise. The handle is cheap to clone and can be shared between
/// repositories and whatever refreshes the token.
#[derive(Debug, Clone, Default)]
pub struct AuthToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl AuthToken {
    /// Creates an empty token handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current token, if set.
    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }

    /// Stores a new token.
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write() = Some(token.into());
    }

    /// Clears the token.
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

/// A request observed by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URL.
    pub url: String,
    /// JSON body, for methods that carry one.
    pub body: Option<Value>,
    /// Request headers.
    pub headers: Vec<(String, String)>,
}

type ScriptedResponse = Result<HttpResponse<Value>, String>;

/// A scripted transport for testing.
///
/// Responses are queued per `(method, url)` and consumed in FIFO
/// order; every observed request is recorded for assertions. A request
/// with no scripted response fails, which keeps tests honest about the
/// calls they expect.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<(Method, String), VecDeque<ScriptedResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockTransport {
    /// Creates a new mock transport with no scripted responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the given method and URL.
    pub fn enqueue(&self, method: Method, url: impl Into<String>, response: HttpResponse<Value>) {
        self.responses
            .lock()
            .entry((method, url.into()))
            .or_default()
            .push_back(Ok(response));
    }

    /// Queues a transport-level failure for the given method and URL.
    pub fn enqueue_error(&self, method: Method, url: impl Into<String>, message: impl Into<String>) {
        self.responses
            .lock()
            .entry((method, url.into()))
            .or_default()
            .push_back(Err(message.into()));
    }

    /// Returns all requests observed so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    fn respond(
        &self,
        method: Method,
        url: &str,
        body: Option<Value>,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>> {
        self.requests.lock().push(RecordedRequest {
            method,
            url: url.to_string(),
            body,
            headers: headers.to_vec(),
        });

        let scripted = self
            .responses
            .lock()
            .get_mut(&(method, url.to_string()))
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(EngineError::remote(message)),
            None => Err(EngineError::remote(format!(
                "no scripted response for {method} {url}"
            ))),
        }
    }
}

#[async_trait]
impl RemoteTransport for MockTransport {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>> {
        self.respond(Method::Get, url, None, headers)
    }

    async fn post(
        &self,
        url: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>> {
        self.respond(Method::Post, url, Some(body), headers)
    }

    async fn put(
        &self,
        url: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>> {
        self.respond(Method::Put, url, Some(body), headers)
    }

    async fn patch(
        &self,
        url: &str,
        body: Value,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>> {
        self.respond(Method::Patch, url, Some(body), headers)
    }

    async fn delete(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> EngineResult<HttpResponse<Value>> {
        self.respond(Method::Delete, url, None, headers)
    }
}
