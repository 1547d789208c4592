//! Identity middleware.
//!
//! Resolves the caller's identity and attaches a [`Principal`] to request
//! extensions. This layer never rejects on its own: requests without a
//! resolvable identity proceed with no principal attached, and the
//! authorization middleware turns that absence into a 401.
//!
//! The default [`HeaderIdentity`] provider trusts identity headers set by
//! an upstream gateway that has already authenticated the client:
//!
//! ```text
//! x-user-id:   u-1042
//! x-user-role: manager
//! ```

use axum::{
    body::Body,
    extract::Request,
    http::HeaderMap,
    response::Response,
};
use futures::future::BoxFuture;
use std::{
    str::FromStr,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};
use tracing::{debug, warn};

use crate::rbac::{Principal, Role};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

// ═══════════════════════════════════════════════════════════════════════════════
// Provider contract
// ═══════════════════════════════════════════════════════════════════════════════

/// Resolves the caller's identity from request headers.
///
/// Implementations decide what counts as proof of identity; the rest of
/// the stack only sees the resulting [`Principal`].
pub trait AuthenticationProvider: Send + Sync {
    fn current_principal(&self, headers: &HeaderMap) -> Option<Principal>;
}

/// Provider that trusts gateway-set identity headers.
#[derive(Debug, Clone, Default)]
pub struct HeaderIdentity;

impl AuthenticationProvider for HeaderIdentity {
    fn current_principal(&self, headers: &HeaderMap) -> Option<Principal> {
        let user_id = headers.get(USER_ID_HEADER)?.to_str().ok()?.trim();
        if user_id.is_empty() {
            return None;
        }
        let role_raw = headers.get(USER_ROLE_HEADER)?.to_str().ok()?.trim();
        match Role::from_str(role_raw) {
            Ok(role) => Some(Principal::new(user_id, role)),
            Err(_) => {
                warn!(role = role_raw, "unrecognized role header, dropping identity");
                None
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer that resolves identity for every request.
#[derive(Clone)]
pub struct AuthLayer {
    provider: Arc<dyn AuthenticationProvider>,
}

impl AuthLayer {
    pub fn new(provider: Arc<dyn AuthenticationProvider>) -> Self {
        Self { provider }
    }

    /// Layer using the trusted-gateway header provider.
    pub fn from_headers() -> Self {
        Self::new(Arc::new(HeaderIdentity))
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            provider: self.provider.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that attaches the resolved [`Principal`] to request extensions.
#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    provider: Arc<dyn AuthenticationProvider>,
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
        if let Some(principal) = self.provider.current_principal(request.headers()) {
            debug!(
                user_id = principal.id.as_str(),
                role = %principal.role,
                "identity resolved"
            );
            request.extensions_mut().insert(principal);
        }
        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(request).await })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn resolves_principal_from_headers() {
        let provider = HeaderIdentity;
        let principal = provider
            .current_principal(&headers(&[
                (USER_ID_HEADER, "u-7"),
                (USER_ROLE_HEADER, "manager"),
            ]))
            .unwrap();
        assert_eq!(principal.id.as_str(), "u-7");
        assert_eq!(principal.role, Role::Manager);
    }

    #[test]
    fn missing_or_blank_id_yields_no_principal() {
        let provider = HeaderIdentity;
        assert!(provider
            .current_principal(&headers(&[(USER_ROLE_HEADER, "admin")]))
            .is_none());
        assert!(provider
            .current_principal(&headers(&[
                (USER_ID_HEADER, "  "),
                (USER_ROLE_HEADER, "admin"),
            ]))
            .is_none());
    }

    #[test]
    fn unknown_role_yields_no_principal() {
        let provider = HeaderIdentity;
        assert!(provider
            .current_principal(&headers(&[
                (USER_ID_HEADER, "u-7"),
                (USER_ROLE_HEADER, "superuser"),
            ]))
            .is_none());
    }
}
