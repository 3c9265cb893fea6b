//! Authentication middleware and extractors.
//!
//! The [`authenticate`] middleware verifies the `Authorization: Bearer`
//! token once per request and stores the resulting [`Claims`] in the request
//! extensions. Handlers read them back with the [`AuthUser`] extractor.

use std::ops::Deref;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use avalon_auth::VerifiedToken;
use avalon_core::Claims;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Short, non-reversible identifier for a token, safe to log.
#[must_use]
pub fn fingerprint(token: &str) -> String {
    let hash = blake3::hash(token.as_bytes());
    hex::encode(&hash.as_bytes()[..8])
}

/// Extract the bearer credential from the request headers.
///
/// A missing header, a non-text value and a blank credential all yield
/// `None`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    (!token.is_empty()).then_some(token)
}

fn claims_from(token: &VerifiedToken) -> Result<Claims, ApiError> {
    token.claims::<Claims>().map_err(|e| {
        tracing::info!(error = %e, "Token payload lacks required claims");
        ApiError::Unauthorized
    })
}

/// Middleware that rejects requests without a valid bearer token.
///
/// On success the verified [`Claims`] are attached to the request.
pub async fn authenticate(
    State(state): State<Arc<GatewayState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        return ApiError::Unauthorized.into_response();
    };

    let verified = match state.verifier.verify(token).await {
        Ok(verified) => verified,
        Err(e) => {
            tracing::info!(
                token = %fingerprint(token),
                error = %e,
                "Token verification failed"
            );
            return ApiError::from(e).into_response();
        }
    };

    let claims = match claims_from(&verified) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(subject = %claims.subject, "Authenticated request");

    request.extensions_mut().insert(claims);
    next.run(request).await
}

/// An authenticated caller.
///
/// Only available behind [`authenticate`]; elsewhere extraction fails with
/// `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The verified claims.
    pub claims: Claims,
}

impl Deref for AuthUser {
    type Target = Claims;

    fn deref(&self) -> &Self::Target {
        &self.claims
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        _state: &'life1 S,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let claims = parts
                .extensions
                .get::<Claims>()
                .cloned()
                .ok_or(ApiError::Unauthorized)?;

            Ok(AuthUser { claims })
        })
    }
}
