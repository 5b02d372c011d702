//! Stubbed requests: one expected request paired with its responder.

use crate::body::Body;
use crate::error::MatchError;
use crate::normalize::{normalize_uri, normalize_url};
use crate::request::IncomingRequest;
use crate::responder::{Responder, ResponseFuture};
use bytes::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Request};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A registered expectation.
///
/// Method and URL are always checked. Headers and body are checked only when
/// set; header checks are subset checks (every value the stub names must be
/// present on the request, extra request headers and values are ignored).
#[derive(Debug)]
pub struct Stub {
    method: String,
    url: String,
    headers: Option<HeaderMap>,
    body: Option<Bytes>,
    responder: Responder,
    called: AtomicBool,
    calls: AtomicUsize,
}

impl Stub {
    pub fn new(method: impl Into<String>, url: impl Into<String>, responder: Responder) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: None,
            body: None,
            responder,
            called: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Require every value in `headers` to be present on the request.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Require a single header value, keeping any already required.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .append(name, value);
        self
    }

    /// Require the request body to equal `body` exactly.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Whether this stub has been selected for at least one request.
    pub fn called(&self) -> bool {
        self.called.load(Ordering::Relaxed)
    }

    /// Number of requests this stub has been selected for.
    pub fn times_called(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Check the request against this stub.
    ///
    /// Checks run in a fixed order and stop at the first failure: method,
    /// URL, headers, body.
    pub async fn matches(&self, request: &mut IncomingRequest) -> Result<(), MatchError> {
        if !self
            .method
            .eq_ignore_ascii_case(request.method().as_str())
        {
            return Err(MatchError::MethodMismatch);
        }

        let expected_url = normalize_url(&self.url)?;
        if expected_url != normalize_uri(request.uri()) {
            return Err(MatchError::UrlMismatch);
        }

        if let Some(expected) = &self.headers {
            let actual = request.headers();
            // HeaderMap::iter yields every value of a multi-valued header
            for (name, value) in expected {
                if !actual.get_all(name).iter().any(|v| v == value) {
                    return Err(MatchError::HeaderMismatch);
                }
            }
        }

        if let Some(expected) = &self.body {
            if request.body().await? != expected {
                return Err(MatchError::BodyMismatch);
            }
        }

        Ok(())
    }

    /// Mark the stub as called and run its responder.
    ///
    /// Selection fulfills the expectation, whatever the responder returns.
    pub fn dispatch(&self, request: Request<Body>) -> ResponseFuture {
        self.called.store(true, Ordering::Relaxed);
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.responder.respond(request)
    }
}

impl fmt::Display for Stub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)?;
        if let Some(headers) = &self.headers {
            write!(f, " with headers {headers:?}")?;
        }
        Ok(())
    }
}
