use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use http::{StatusCode, request::Parts};

use sesskit::Session;

/// The request's session, published by
/// [`session_middleware`](crate::session_middleware).
///
/// As a required extractor it rejects with 500 when the middleware is not
/// installed on the route; extract `Option<CurrentSession>` to probe
/// instead.
#[derive(Clone)]
pub struct CurrentSession(pub Arc<dyn Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentSession>().cloned().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            "session middleware not installed",
        ))
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentSession>().cloned())
    }
}
