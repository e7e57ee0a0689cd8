//! Bearer-token extractor.
//!
//! Handlers that require a caller take an `Authenticated` argument. The
//! router state supplies the verifier through `IdentityState`.

use crate::error::ApiError;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use shared_types::{parse_bearer, IdentityVerifier, SubjectId};
use tracing::debug;

/// Router state that can verify bearer tokens.
pub trait IdentityState {
    fn identity_verifier(&self) -> &dyn IdentityVerifier;
}

/// The verified caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authenticated(pub SubjectId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Authenticated
where
    S: IdentityState + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = parse_bearer(header)?;
        let subject = state.identity_verifier().verify(token).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            ApiError::from(e)
        })?;
        Ok(Authenticated(subject))
    }
}
