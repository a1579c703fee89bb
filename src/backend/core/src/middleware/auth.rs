//! Bearer-token authentication middleware.
//!
//! Verifies the access token on every request outside the public path
//! list and injects the resulting [`Actor`] as a request extension.
//! Handlers take `Actor` via its extractor; anything deeper (ownership,
//! scoping) is the authorization layer's job, not this one's.

use axum::{
    body::Body,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use futures::future::BoxFuture;
use metrics::counter;
use std::{
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::debug;

use crate::auth::TokenService;
use crate::authz::Actor;
use crate::error::ForgeError;

/// Paths served without a token. Health and metrics endpoints, plus the
/// two endpoints that mint tokens in the first place.
const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/metrics",
    "/api/v1/auth/login",
    "/api/v1/auth/refresh",
];

fn is_public(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Tower layer wiring [`AuthService`] around a router.
#[derive(Clone)]
pub struct AuthLayer {
    tokens: Arc<TokenService>,
}

impl AuthLayer {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    tokens: Arc<TokenService>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let tokens = self.tokens.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if is_public(request.uri().path()) {
                return inner.call(request).await;
            }

            let Some(token) = bearer_token(&request) else {
                counter!("taskforge_auth_failures_total", "reason" => "missing").increment(1);
                return Ok(ForgeError::unauthenticated("missing bearer token").into_response());
            };

            match tokens.verify_access(token) {
                Ok(claims) => {
                    let actor = claims.actor();
                    debug!(actor = %actor.id, role = %actor.role, "request authenticated");
                    request.extensions_mut().insert(actor);
                    inner.call(request).await
                }
                Err(e) => {
                    counter!("taskforge_auth_failures_total",
                        "reason" => e.code().to_string())
                    .increment(1);
                    Ok(e.into_response())
                }
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Axum Extractor
// ═══════════════════════════════════════════════════════════════════════════════

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = ForgeError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .copied()
            .ok_or_else(|| ForgeError::unauthenticated("request is not authenticated"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_paths() {
        assert!(is_public("/health"));
        assert!(is_public("/api/v1/auth/login"));
        assert!(!is_public("/api/v1/auth/logout"));
        assert!(!is_public("/api/v1/tasks"));
    }

    #[test]
    fn test_bearer_extraction() {
        let req = Request::builder()
            .header("Authorization", "Bearer abc.def.ghi")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), Some("abc.def.ghi"));

        let req = Request::builder()
            .header("Authorization", "Basic dXNlcjpwYXNz")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&req), None);

        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&req), None);
    }
}
