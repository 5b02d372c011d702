//! MockTransport - the transport that answers requests from registered stubs.
//!
//! Stubs are tried in registration order and the first match wins, so more
//! specific stubs must be registered before more general ones that overlap
//! them. When nothing matches, the request is either passed through to a real
//! transport (allow-listed hosts only), handed to the fallback responder, or
//! failed with [`NoResponderFound`].

use crate::body::{Body, BoxError};
use crate::error::{NoResponderFound, StubsNotCalled};
use crate::normalize::request_host;
use crate::request::IncomingRequest;
use crate::responder::Responder;
use crate::stub::Stub;
use crate::transport::Transport;
use async_trait::async_trait;
use hyper::{Request, Response, Uri};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Hosts allowed to reach the network, and the transport they go through.
struct Passthrough {
    hosts: HashSet<String>,
    transport: Arc<dyn Transport>,
}

/// Transport that never touches the network unless told to.
#[derive(Default)]
pub struct MockTransport {
    /// Registered stubs, in match priority order
    stubs: RwLock<Vec<Arc<Stub>>>,
    /// Called when no stub matches and the host is not allow-listed
    fallback: RwLock<Option<Responder>>,
    passthrough: RwLock<Option<Passthrough>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append stubs, preserving their order.
    pub fn register_stubs(&self, stubs: impl IntoIterator<Item = Stub>) {
        let mut registered = self.stubs.write();
        let before = registered.len();
        registered.extend(stubs.into_iter().map(Arc::new));
        debug!(
            "Registered {} stub(s), {} total",
            registered.len() - before,
            registered.len()
        );
    }

    /// Replace the fallback responder.
    pub fn register_fallback_responder(&self, responder: Responder) {
        *self.fallback.write() = Some(responder);
    }

    /// Remove every stub and the fallback responder.
    pub fn reset(&self) {
        let mut stubs = self.stubs.write();
        let mut fallback = self.fallback.write();
        stubs.clear();
        *fallback = None;
    }

    /// Number of registered stubs.
    pub fn stub_count(&self) -> usize {
        self.stubs.read().len()
    }

    /// Snapshot of the registered stubs.
    pub fn stubs(&self) -> Vec<Arc<Stub>> {
        self.stubs.read().clone()
    }

    /// Let unmatched requests for `hosts` reach `transport`.
    ///
    /// Replaces any previous allow-list. Hosts are bare hostnames compared
    /// case-sensitively against the request host with its port removed.
    pub fn set_passthrough(
        &self,
        hosts: impl IntoIterator<Item = String>,
        transport: Arc<dyn Transport>,
    ) {
        *self.passthrough.write() = Some(Passthrough {
            hosts: hosts.into_iter().collect(),
            transport,
        });
    }

    /// Drop the allow-list.
    pub fn clear_passthrough(&self) {
        *self.passthrough.write() = None;
    }

    /// Whether unmatched requests to `uri` may go to the real transport.
    pub fn is_allowed(&self, uri: &Uri) -> bool {
        self.passthrough_for(uri).is_some()
    }

    fn passthrough_for(&self, uri: &Uri) -> Option<Arc<dyn Transport>> {
        let host = request_host(uri)?;
        self.passthrough
            .read()
            .as_ref()
            .filter(|p| p.hosts.contains(host))
            .map(|p| Arc::clone(&p.transport))
    }

    /// Ok if every registered stub has been called at least once.
    pub fn all_stubs_called(&self) -> Result<(), StubsNotCalled> {
        let uncalled: Vec<String> = self
            .stubs
            .read()
            .iter()
            .filter(|stub| !stub.called())
            .map(|stub| stub.to_string())
            .collect();

        if uncalled.is_empty() {
            Ok(())
        } else {
            Err(StubsNotCalled::new(uncalled))
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, BoxError> {
        // Match against a snapshot so registration never blocks on a slow body
        let stubs = self.stubs();
        let mut incoming = IncomingRequest::new(request);
        let mut errors = Vec::with_capacity(stubs.len());

        for (index, stub) in stubs.iter().enumerate() {
            match stub.matches(&mut incoming).await {
                Ok(()) => {
                    debug!("Stub {} matched: {}", index, stub);
                    return stub.dispatch(incoming.into_request()).await;
                }
                Err(e) => {
                    trace!("Stub {} skipped ({}): {}", index, stub, e);
                    errors.push(e);
                }
            }
        }

        let not_found = NoResponderFound::new(errors);
        let request = incoming.into_request();

        if let Some(transport) = self.passthrough_for(request.uri()) {
            info!(
                "Passing {} {} through to the real transport",
                request.method(),
                request.uri()
            );
            return transport.round_trip(request).await;
        }

        let fallback = self.fallback.read().clone();
        match fallback {
            Some(responder) => {
                debug!(
                    "No stub matched {} {}, using fallback responder",
                    request.method(),
                    request.uri()
                );
                responder.respond(request).await
            }
            None => {
                warn!(
                    "No responder found for {} {}: {}",
                    request.method(),
                    request.uri(),
                    not_found
                );
                Err(not_found.into())
            }
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("stubs", &self.stub_count())
            .field("fallback", &self.fallback.read().is_some())
            .finish_non_exhaustive()
    }
}
