//! Error types for stub matching and verification.

use std::fmt;
use std::sync::Arc;

// ============================================================================
// Match Errors
// ============================================================================

/// Reason a single stub did not match an incoming request.
///
/// Checks short-circuit in a fixed order (method, URL, headers, body), so the
/// variant reported is the first aspect that failed.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MatchError {
    #[error("Failed to parse URL {url:?}: {reason}")]
    UrlParse { url: String, reason: String },
    #[error("Incorrect request method attempted")]
    MethodMismatch,
    #[error("Incorrect URL used")]
    UrlMismatch,
    #[error("Incorrect HTTP headers sent")]
    HeaderMismatch,
    #[error("Incorrect request body sent")]
    BodyMismatch,
    #[error("Failed to read request body: {0}")]
    Io(#[source] Arc<std::io::Error>),
}

impl MatchError {
    pub(crate) fn io(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        MatchError::Io(Arc::new(std::io::Error::other(err)))
    }
}

// ============================================================================
// Transport Errors
// ============================================================================

/// Returned when no registered stub matched a request.
///
/// Carries one mismatch reason per registered stub, in registration order.
#[derive(Debug, Clone, Default)]
pub struct NoResponderFound {
    errors: Vec<MatchError>,
}

impl NoResponderFound {
    pub fn new(errors: Vec<MatchError>) -> Self {
        Self { errors }
    }

    /// Per-stub mismatch reasons
    pub fn errors(&self) -> &[MatchError] {
        &self.errors
    }
}

impl fmt::Display for NoResponderFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return f.write_str("No responders found");
        }
        let reasons: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "Responder errors: {}", reasons.join(", "))
    }
}

impl std::error::Error for NoResponderFound {}

// ============================================================================
// Verification Errors
// ============================================================================

/// Returned by verification when some registered stubs were never dispatched.
#[derive(Debug, Clone)]
pub struct StubsNotCalled {
    uncalled: Vec<String>,
}

impl StubsNotCalled {
    pub fn new(uncalled: Vec<String>) -> Self {
        Self { uncalled }
    }

    /// Descriptions of the stubs that were never called
    pub fn uncalled(&self) -> &[String] {
        &self.uncalled
    }
}

impl fmt::Display for StubsNotCalled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uncalled.is_empty() {
            return f.write_str("No registered stubs");
        }
        write!(f, "Uncalled stubs: {}", self.uncalled.join(", "))
    }
}

impl std::error::Error for StubsNotCalled {}
