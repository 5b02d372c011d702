//! Process-wide activation of the shared mock transport.
//!
//! `activate` installs the shared [`MockTransport`] as the process default
//! transport; `activate_for_client` installs it on one [`Client`] instead.
//! Both remember what they replaced so `deactivate` can put it back. Setup and
//! teardown are expected to be serialized per test.

use crate::config::{disabled, MockConfig};
use crate::error::StubsNotCalled;
use crate::mock::MockTransport;
use crate::responder::Responder;
use crate::stub::Stub;
use crate::transport::{default_transport, set_default_transport, Client, Transport};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

static MOCK_TRANSPORT: Lazy<Arc<MockTransport>> = Lazy::new(|| Arc::new(MockTransport::new()));

static STATE: Lazy<Mutex<ActivationState>> = Lazy::new(|| Mutex::new(ActivationState::default()));

/// What activation replaced, so deactivation can restore it
#[derive(Default)]
struct ActivationState {
    /// Real default transport, saved by the first `activate`
    saved_default: Option<Arc<dyn Transport>>,
    /// Clients the mock was installed on, with their original transports
    clients: Vec<(Client, Option<Arc<dyn Transport>>)>,
}

impl ActivationState {
    /// Transport allow-listed requests are sent through
    fn real_transport(&self) -> Arc<dyn Transport> {
        self.saved_default.clone().unwrap_or_else(default_transport)
    }
}

/// The mock transport shared by every activation.
pub fn mock_transport() -> Arc<MockTransport> {
    Arc::clone(&MOCK_TRANSPORT)
}

/// Install the shared mock transport as the process default transport.
///
/// Calling it again while active keeps the originally saved transport, and
/// replaces the allow-list with `config.allowed_hosts`. Does nothing when
/// mocking is disabled through the environment.
pub fn activate(config: MockConfig) -> MockGuard {
    if disabled() {
        info!("Mocking disabled by environment, activate is a no-op");
        return MockGuard::inert();
    }

    let mock = mock_transport();
    let mut state = STATE.lock();
    let previous = set_default_transport(mock.clone());
    if state.saved_default.is_none() {
        state.saved_default = Some(previous);
    }

    mock.set_passthrough(config.allowed_hosts, state.real_transport());
    info!("Mocking activated on the default transport");
    MockGuard::armed()
}

/// Install the shared mock transport on a specific client.
///
/// The client's original transport is cached for [`deactivate`]. Activating
/// the same client twice keeps the first cached transport.
pub fn activate_for_client(client: &Client, config: MockConfig) -> MockGuard {
    if disabled() {
        info!("Mocking disabled by environment, activate_for_client is a no-op");
        return MockGuard::inert();
    }

    let mock = mock_transport();
    let mut state = STATE.lock();
    let previous = client.set_transport(Some(mock.clone()));
    if !state.clients.iter().any(|(c, _)| c.same_client(client)) {
        state.clients.push((client.clone(), previous));
    }

    mock.set_passthrough(config.allowed_hosts, state.real_transport());
    info!("Mocking activated on a custom client");
    MockGuard::armed()
}

/// Restore every transport replaced by activation.
pub fn deactivate() {
    if disabled() {
        return;
    }

    let mut state = STATE.lock();
    if let Some(real) = state.saved_default.take() {
        set_default_transport(real);
        debug!("Default transport restored");
    }
    for (client, original) in state.clients.drain(..) {
        client.set_transport(original);
        debug!("Client transport restored");
    }
    info!("Mocking deactivated");
}

/// Remove every registered stub and the fallback responder.
pub fn reset() {
    mock_transport().reset();
}

/// [`deactivate`] followed by [`reset`].
pub fn deactivate_and_reset() {
    deactivate();
    reset();
}

/// Register stubs on the shared mock transport.
pub fn register_stubs(stubs: impl IntoIterator<Item = Stub>) {
    mock_transport().register_stubs(stubs);
}

/// Set the responder used when no stub matches.
pub fn register_fallback_responder(responder: Responder) {
    mock_transport().register_fallback_responder(responder);
}

/// Ok if every stub registered on the shared mock transport has been called.
pub fn all_stubs_called() -> Result<(), StubsNotCalled> {
    mock_transport().all_stubs_called()
}

/// Handle returned by activation.
///
/// Dropping it runs [`deactivate_and_reset`]; call [`MockGuard::keep`] to leave
/// mocking active for the rest of the process.
///
/// Deactivation is process-wide: dropping any armed guard restores the default
/// transport and every activated client, including those activated through
/// other guards that are still alive, and clears all stubs.
#[must_use = "dropping the guard deactivates mocking immediately"]
#[derive(Debug)]
pub struct MockGuard {
    armed: bool,
}

impl MockGuard {
    fn armed() -> Self {
        Self { armed: true }
    }

    fn inert() -> Self {
        Self { armed: false }
    }

    /// Restore the replaced transports, keeping registered stubs.
    pub fn deactivate(mut self) {
        self.armed = false;
        deactivate();
    }

    /// Restore the replaced transports and clear registered stubs.
    pub fn deactivate_and_reset(mut self) {
        self.armed = false;
        deactivate_and_reset();
    }

    /// Leave mocking active after the guard goes away.
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for MockGuard {
    fn drop(&mut self) {
        if self.armed {
            deactivate_and_reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{full, to_bytes, Body, BoxError};
    use crate::error::NoResponderFound;
    use async_trait::async_trait;
    use hyper::{Request, Response};
    use serial_test::serial;
    use tracing_test::traced_test;

    struct Fixed(&'static str);

    #[async_trait]
    impl Transport for Fixed {
        async fn round_trip(&self, _request: Request<Body>) -> Result<Response<Body>, BoxError> {
            Ok(Response::new(full(self.0)))
        }
    }

    async fn body_of(response: Response<Body>) -> String {
        String::from_utf8(to_bytes(response.into_body()).await.unwrap().to_vec()).unwrap()
    }

    #[tokio::test]
    #[serial]
    async fn test_activate_installs_mock_and_deactivate_restores() {
        deactivate_and_reset();
        let original = set_default_transport(Arc::new(Fixed("real")));

        let guard = activate(MockConfig::default());
        register_stubs([Stub::new("GET", "http://a/", Responder::string(200, "mocked"))]);
        let response = Client::new().get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "mocked");

        guard.deactivate_and_reset();
        let response = Client::new().get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "real");
        assert_eq!(mock_transport().stub_count(), 0);

        set_default_transport(original);
    }

    #[tokio::test]
    #[serial]
    async fn test_activate_twice_keeps_saved_transport() {
        deactivate_and_reset();
        let original = set_default_transport(Arc::new(Fixed("real")));

        let first = activate(MockConfig::default());
        let second = activate(MockConfig::default());
        second.keep();
        first.deactivate();

        let response = Client::new().get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "real");

        set_default_transport(original);
    }

    #[tokio::test]
    #[serial]
    async fn test_reactivation_replaces_allow_list() {
        deactivate_and_reset();
        let original = set_default_transport(Arc::new(Fixed("real")));

        let first = activate(MockConfig::new().allowed_hosts(["example.com"]));
        let second = activate(MockConfig::new().allowed_hosts(["other.com"]));
        let mock = mock_transport();
        assert!(!mock.is_allowed(&"http://example.com/".parse().unwrap()));
        assert!(mock.is_allowed(&"http://other.com/".parse().unwrap()));

        second.keep();
        first.deactivate_and_reset();
        set_default_transport(original);
    }

    #[tokio::test]
    #[serial]
    async fn test_activate_for_client_restores_original() {
        deactivate_and_reset();
        let client = Client::with_transport(Arc::new(Fixed("client original")));

        let guard = activate_for_client(&client, MockConfig::default());
        let err = client.get("http://a/").await.unwrap_err();
        assert!(err.downcast_ref::<NoResponderFound>().is_some());

        // second activation must not cache the mock as the original
        activate_for_client(&client, MockConfig::default()).keep();

        guard.deactivate();
        let response = client.get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "client original");
    }

    #[tokio::test]
    #[serial]
    async fn test_activate_for_client_leaves_default_alone() {
        deactivate_and_reset();
        let original = set_default_transport(Arc::new(Fixed("real default")));
        let client = Client::new();

        let guard = activate_for_client(&client, MockConfig::default());
        register_stubs([Stub::new("GET", "http://a/", Responder::string(200, "mocked"))]);

        let response = client.get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "mocked");
        let other = Client::new().get("http://a/").await.unwrap();
        assert_eq!(body_of(other).await, "real default");

        guard.deactivate_and_reset();
        assert!(client.transport().is_none());
        set_default_transport(original);
    }

    #[tokio::test]
    #[serial]
    async fn test_dropping_guard_deactivates_and_resets() {
        deactivate_and_reset();
        let original = set_default_transport(Arc::new(Fixed("real")));

        {
            let _guard = activate(MockConfig::default());
            register_stubs([Stub::new("GET", "http://a/", Responder::string(200, "mocked"))]);
        }

        assert_eq!(mock_transport().stub_count(), 0);
        let response = Client::new().get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "real");
        set_default_transport(original);
    }

    #[tokio::test]
    #[serial]
    async fn test_dropping_one_guard_restores_every_client() {
        deactivate_and_reset();
        let first = Client::with_transport(Arc::new(Fixed("first")));
        let second = Client::with_transport(Arc::new(Fixed("second")));

        let first_guard = activate_for_client(&first, MockConfig::default());
        let second_guard = activate_for_client(&second, MockConfig::default());
        drop(first_guard);

        let response = second.get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "second");
        let response = first.get("http://a/").await.unwrap();
        assert_eq!(body_of(response).await, "first");

        second_guard.keep();
    }

    #[tokio::test]
    #[serial]
    #[traced_test]
    async fn test_activation_is_logged() {
        deactivate_and_reset();
        let original = set_default_transport(Arc::new(Fixed("real")));

        activate(MockConfig::default()).deactivate_and_reset();

        assert!(logs_contain("Mocking activated on the default transport"));
        assert!(logs_contain("Mocking deactivated"));
        set_default_transport(original);
    }
}
