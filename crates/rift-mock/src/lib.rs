//! In-process HTTP mocking for test suites.
//!
//! Requests sent through a [`Client`] go through a [`Transport`]. Activating
//! mocking swaps that transport for a [`MockTransport`], which answers each
//! request from the first registered [`Stub`] that matches it.
//!
//! ```no_run
//! use rift_mock::{activate, all_stubs_called, register_stubs, Client, MockConfig, Responder, Stub};
//!
//! # async fn run() -> Result<(), rift_mock::BoxError> {
//! let guard = activate(MockConfig::default());
//! register_stubs([Stub::new(
//!     "GET",
//!     "https://api.mybiz.com/articles.json",
//!     Responder::string(200, r#"[{"id": 1}]"#),
//! )]);
//!
//! let response = Client::new().get("https://api.mybiz.com/articles.json").await?;
//! assert_eq!(response.status(), 200);
//! all_stubs_called()?;
//! guard.deactivate_and_reset();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Structure
//!
//! - `normalize`: URL canonicalization (query order independent)
//! - `stub`: stubbed requests and their matching rules
//! - `mock`: the mock transport, fallback and allow-listed pass-through
//! - `transport`: the transport trait, the real network transport and `Client`
//! - `activation`: process-wide install/restore of the mock transport

pub mod activation;
pub mod body;
pub mod config;
pub mod error;
pub mod mock;
pub mod normalize;
pub mod request;
pub mod responder;
pub mod stub;
pub mod transport;

pub use activation::{
    activate, activate_for_client, all_stubs_called, deactivate, deactivate_and_reset,
    mock_transport, register_fallback_responder, register_stubs, reset, MockGuard,
};
pub use body::{Body, BoxError};
pub use config::{disabled, MockConfig, DISABLE_ENV_VAR};
pub use error::{MatchError, NoResponderFound, StubsNotCalled};
pub use mock::MockTransport;
pub use normalize::normalize_url;
pub use responder::Responder;
pub use stub::Stub;
pub use transport::{default_transport, set_default_transport, Client, HyperTransport, Transport};
