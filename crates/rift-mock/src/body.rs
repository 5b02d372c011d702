//! Body type shared by mocked requests and responses.

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use std::convert::Infallible;

/// Boxed error type used for body and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Body carried by every request and response passing through a transport.
pub type Body = BoxBody<Bytes, BoxError>;

/// Build a body from a complete payload.
pub fn full(data: impl Into<Bytes>) -> Body {
    BoxBody::new(Full::new(data.into()).map_err(|never: Infallible| match never {}))
}

/// Build an empty body.
pub fn empty() -> Body {
    BoxBody::new(Empty::<Bytes>::new().map_err(|never: Infallible| match never {}))
}

/// Read a body to completion.
pub async fn to_bytes(body: Body) -> Result<Bytes, BoxError> {
    Ok(body.collect().await?.to_bytes())
}
