//! Request wrapper used while matching stubs.

use crate::body::{empty, full, to_bytes, Body};
use crate::error::MatchError;
use bytes::Bytes;
use hyper::http::request::Parts;
use hyper::{HeaderMap, Method, Request, Uri};
use tracing::warn;

enum BodyState {
    Unread(Body),
    Buffered(Bytes),
    Failed(MatchError),
}

/// An intercepted request whose body is buffered lazily, at most once.
///
/// The first stub that checks the body reads it to completion; every later
/// stub, and finally the selected responder, sees the same bytes.
pub struct IncomingRequest {
    parts: Parts,
    body: BodyState,
}

impl IncomingRequest {
    pub fn new(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            parts,
            body: BodyState::Unread(body),
        }
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Full request body, reading it on first access.
    ///
    /// A read failure is remembered and reported to every later caller.
    pub async fn body(&mut self) -> Result<&Bytes, MatchError> {
        let state = std::mem::replace(&mut self.body, BodyState::Buffered(Bytes::new()));
        self.body = match state {
            BodyState::Unread(body) => match to_bytes(body).await {
                Ok(bytes) => BodyState::Buffered(bytes),
                Err(e) => BodyState::Failed(MatchError::io(e)),
            },
            other => other,
        };
        match &self.body {
            BodyState::Buffered(bytes) => Ok(bytes),
            BodyState::Failed(err) => Err(err.clone()),
            BodyState::Unread(_) => Err(MatchError::io("request body was not buffered")),
        }
    }

    /// Rebuild the request, replaying a buffered body.
    ///
    /// A body that failed to read is replaced with an empty one.
    pub fn into_request(self) -> Request<Body> {
        let body = match self.body {
            BodyState::Unread(body) => body,
            BodyState::Buffered(bytes) => full(bytes),
            BodyState::Failed(err) => {
                warn!(
                    "Forwarding {} {} with an empty body: {}",
                    self.parts.method, self.parts.uri, err
                );
                empty()
            }
        };
        Request::from_parts(self.parts, body)
    }
}
