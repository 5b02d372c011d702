//! Pluggable request execution.
//!
//! Everything that sends a request goes through a [`Transport`]. The process
//! keeps one default transport (the real network one unless replaced), and a
//! [`Client`] either uses that default or a transport injected into it. Mocking
//! works by swapping one of these installation points for a mock transport.

use crate::body::{Body, BoxError};
use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::{Request, Response};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::rt::TokioExecutor;
use once_cell::sync::{Lazy, OnceCell};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Executes a single HTTP request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, BoxError>;
}

// ============================================================================
// Process default
// ============================================================================

static DEFAULT_TRANSPORT: Lazy<RwLock<Arc<dyn Transport>>> =
    Lazy::new(|| RwLock::new(Arc::new(HyperTransport::new())));

/// Transport used by clients that have none of their own.
pub fn default_transport() -> Arc<dyn Transport> {
    Arc::clone(&*DEFAULT_TRANSPORT.read())
}

/// Replace the process default transport, returning the previous one.
pub fn set_default_transport(transport: Arc<dyn Transport>) -> Arc<dyn Transport> {
    std::mem::replace(&mut *DEFAULT_TRANSPORT.write(), transport)
}

// ============================================================================
// Real network transport
// ============================================================================

/// Type alias for the HTTP client backing [`HyperTransport`].
type HttpClient = LegacyClient<hyper_rustls::HttpsConnector<HttpConnector>, Body>;

/// Real network transport: hyper's pooled client over rustls.
///
/// The underlying client is built on first use, so creating one (including the
/// process default) never touches the system certificate store.
#[derive(Default)]
pub struct HyperTransport {
    client: OnceCell<HttpClient>,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&HttpClient, BoxError> {
        self.client.get_or_try_init(|| {
            let mut http_connector = HttpConnector::new();
            http_connector.enforce_http(false); // Allow both HTTP and HTTPS

            let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
                .with_provider_and_native_roots(rustls::crypto::ring::default_provider())?
                .https_or_http()
                .enable_http1()
                .wrap_connector(http_connector);

            Ok(LegacyClient::builder(TokioExecutor::new()).build(https_connector))
        })
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        debug!("Sending {} {} over the network", request.method(), request.uri());
        let response = self.client()?.request(request).await?;
        Ok(response.map(|body| body.map_err(BoxError::from).boxed()))
    }
}

// ============================================================================
// Client
// ============================================================================

/// HTTP client with a replaceable transport.
///
/// Clones share the same transport slot, so swapping the transport on one
/// clone affects all of them.
#[derive(Clone, Default)]
pub struct Client {
    transport: Arc<RwLock<Option<Arc<dyn Transport>>>>,
}

impl Client {
    /// Client that sends through the process default transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client that sends through `transport`.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Arc::new(RwLock::new(Some(transport))),
        }
    }

    /// The transport injected into this client, if any.
    pub fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.transport.read().clone()
    }

    /// Replace this client's transport, returning the previous one.
    ///
    /// `None` makes the client fall back to the process default.
    pub fn set_transport(
        &self,
        transport: Option<Arc<dyn Transport>>,
    ) -> Option<Arc<dyn Transport>> {
        std::mem::replace(&mut *self.transport.write(), transport)
    }

    /// Whether `other` is this client or one of its clones.
    pub fn same_client(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.transport, &other.transport)
    }

    /// Send a request through the effective transport.
    pub async fn execute(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        let transport = self.transport().unwrap_or_else(default_transport);
        transport.round_trip(request).await
    }

    /// Send a `GET` with an empty body.
    pub async fn get(&self, url: &str) -> Result<Response<Body>, BoxError> {
        let request = Request::get(url).body(crate::body::empty())?;
        self.execute(request).await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("custom_transport", &self.transport.read().is_some())
            .finish()
    }
}
