//! Responders: the functions that turn a matched request into a response.
//!
//! A responder is the only extension point a test author needs. It receives
//! the intercepted request (body already replayable) and returns either a
//! response or a failure, which is handed back to the caller untouched.

use crate::body::{full, Body, BoxError};
use crate::transport::Transport;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use hyper::{header, Request, Response};
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;

/// Future returned by a responder.
pub type ResponseFuture = BoxFuture<'static, Result<Response<Body>, BoxError>>;

type ResponderFn = dyn Fn(Request<Body>) -> ResponseFuture + Send + Sync;

/// Produces a response (or failure) for a matched request.
#[derive(Clone)]
pub struct Responder {
    inner: Arc<ResponderFn>,
}

impl Responder {
    /// Wrap a synchronous closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Result<Response<Body>, BoxError> + Send + Sync + 'static,
    {
        Self::from_async(move |req| std::future::ready(f(req)))
    }

    /// Wrap an async closure.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Request<Body>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<Body>, BoxError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |req| f(req).boxed()),
        }
    }

    /// Delegate every request to a transport, e.g. the real network one.
    pub fn from_transport(transport: Arc<dyn Transport>) -> Self {
        Self::from_async(move |req| {
            let transport = Arc::clone(&transport);
            async move { transport.round_trip(req).await }
        })
    }

    /// Always respond with the given status and text body.
    pub fn string(status: u16, body: impl Into<String>) -> Self {
        Self::bytes(status, Bytes::from(body.into()))
    }

    /// Always respond with the given status and raw body.
    pub fn bytes(status: u16, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        Self::new(move |_req| {
            Ok(Response::builder()
                .status(status)
                .body(full(body.clone()))?)
        })
    }

    /// Always respond with `value` serialized as JSON.
    ///
    /// Serialization happens once, up front.
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Result<Self, serde_json::Error> {
        let body = Bytes::from(serde_json::to_vec(value)?);
        Ok(Self::new(move |_req| {
            Ok(Response::builder()
                .status(status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(full(body.clone()))?)
        }))
    }

    /// Always fail as if the connection had been refused.
    pub fn connection_failure() -> Self {
        Self::new(|req| {
            Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                format!("connection refused: {}", req.uri()),
            )
            .into())
        })
    }

    /// Invoke the responder.
    pub fn respond(&self, request: Request<Body>) -> ResponseFuture {
        (self.inner)(request)
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder").finish_non_exhaustive()
    }
}
