//! Axum authorization middleware.
//!
//! Wraps a route with an [`AccessPolicy`] evaluation. The layer reads the
//! [`Principal`] attached by the identity middleware, extracts the target
//! resource reference declared by [`TargetSource`], evaluates the policy,
//! and either rejects with a structured denial response or forwards the
//! request with an [`RbacContext`] in its extensions.

use axum::{
    body::{to_bytes, Body},
    extract::{FromRequestParts, Request},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use metrics::counter;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::models::{AccessDecision, DenyReason, Principal, ResourceRef, UserId};
use super::policy::{AccessContext, AccessPolicy};
use crate::audit::{AuditAction, AuditEvent, AuditLevel, AuditSink};
use crate::error::PalisadeError;
use crate::store::ResourceLookup;

/// Upper bound when buffering a request body to read a target field.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// Target extraction
// ═══════════════════════════════════════════════════════════════════════════════

/// Where a route's target resource id lives, if anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    /// The route has no per-resource target (list, create-post, logs).
    None,
    /// The id is the final path segment (`/api/v1/users/:id`).
    PathTail,
    /// The id is the segment before a fixed suffix
    /// (`/api/v1/posts/:id/publish`).
    PathBeforeSuffix(&'static str),
    /// The id is a string field of the JSON request body, referencing a
    /// resource that does not exist yet (`managerId` on user creation).
    BodyField(&'static str),
}

fn path_tail(path: &str) -> Option<&str> {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

fn path_before_suffix<'a>(path: &'a str, suffix: &str) -> Option<&'a str> {
    let mut segments = path.trim_end_matches('/').rsplit('/');
    match segments.next() {
        Some(last) if last == suffix => segments.next().filter(|s| !s.is_empty()),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RBAC context (extracted in handlers)
// ═══════════════════════════════════════════════════════════════════════════════

/// Authorization outcome attached to requests that passed the policy.
///
/// Handlers extract this instead of re-evaluating the policy; it carries
/// the verified caller and the resolved target, if the route had one.
#[derive(Debug, Clone)]
pub struct RbacContext {
    pub principal: Principal,
    pub policy: &'static str,
    pub target: Option<ResourceRef>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for RbacContext
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RbacContext>()
            .cloned()
            .ok_or_else(|| {
                let body = serde_json::json!({
                    "success": false,
                    "error": {
                        "code": "INTERNAL_ERROR",
                        "message": "Authorization context not available",
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Layer
// ═══════════════════════════════════════════════════════════════════════════════

/// Layer enforcing one [`AccessPolicy`] on the wrapped route.
#[derive(Clone)]
pub struct AuthorizeLayer {
    policy: Arc<AccessPolicy>,
    target_source: TargetSource,
    lookup: Arc<dyn ResourceLookup>,
    audit: Arc<dyn AuditSink>,
}

impl AuthorizeLayer {
    pub fn new(
        policy: AccessPolicy,
        target_source: TargetSource,
        lookup: Arc<dyn ResourceLookup>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            policy: Arc::new(policy),
            target_source,
            lookup,
            audit,
        }
    }
}

impl<S> Layer<S> for AuthorizeLayer {
    type Service = AuthorizeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizeService {
            inner,
            policy: self.policy.clone(),
            target_source: self.target_source,
            lookup: self.lookup.clone(),
            audit: self.audit.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tower Service
// ═══════════════════════════════════════════════════════════════════════════════

/// Service that evaluates the policy before calling the inner route.
#[derive(Clone)]
pub struct AuthorizeService<S> {
    inner: S,
    policy: Arc<AccessPolicy>,
    target_source: TargetSource,
    lookup: Arc<dyn ResourceLookup>,
    audit: Arc<dyn AuditSink>,
}

impl<S> Service<Request<Body>> for AuthorizeService<S>
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

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let policy = self.policy.clone();
        let target_source = self.target_source;
        let lookup = self.lookup.clone();
        let audit = self.audit.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(principal) = request.extensions().get::<Principal>().cloned() else {
                // No identity, so nothing meaningful to audit.
                counter!(
                    "palisade_authz_denials_total",
                    "policy" => policy.name(),
                    "reason" => DenyReason::NotAuthenticated.code(),
                )
                .increment(1);
                return Ok(PalisadeError::denied(DenyReason::NotAuthenticated).into_response());
            };

            let (target, request) = match extract_target(
                request,
                target_source,
                policy.as_ref(),
                lookup.as_ref(),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(response) => {
                    if response.status() == StatusCode::NOT_FOUND {
                        record_denial(
                            &audit,
                            &principal,
                            policy.as_ref(),
                            DenyReason::ResourceNotFound,
                        )
                        .await;
                    }
                    return Ok(response);
                }
            };

            let mut ctx = AccessContext::new(policy.action(), policy.resource());
            if let Some(target) = target.clone() {
                ctx = ctx.with_target(target);
            }

            match policy.evaluate(&principal, &ctx) {
                AccessDecision::Allow => {
                    debug!(
                        policy = policy.name(),
                        user_id = principal.id.as_str(),
                        role = %principal.role,
                        "access granted"
                    );
                    let mut request = request;
                    request.extensions_mut().insert(RbacContext {
                        principal,
                        policy: policy.name(),
                        target,
                    });
                    inner.call(request).await
                }
                AccessDecision::Deny(reason) => {
                    warn!(
                        policy = policy.name(),
                        user_id = principal.id.as_str(),
                        role = %principal.role,
                        reason = ?reason,
                        "access denied"
                    );
                    record_denial(&audit, &principal, policy.as_ref(), reason).await;
                    Ok(PalisadeError::denied(reason).into_response())
                }
            }
        })
    }
}

/// Resolve the route's target reference per its [`TargetSource`].
///
/// Body-sourced targets buffer and restore the request body so the inner
/// handler can still deserialize it. A path-sourced id that resolves to no
/// stored resource short-circuits with a not-found response (`Err`).
async fn extract_target(
    request: Request<Body>,
    source: TargetSource,
    policy: &AccessPolicy,
    lookup: &dyn ResourceLookup,
) -> Result<(Option<ResourceRef>, Request<Body>), Response> {
    match source {
        TargetSource::None => Ok((None, request)),
        TargetSource::PathTail | TargetSource::PathBeforeSuffix(_) => {
            let path = request.uri().path().to_string();
            let id = match source {
                TargetSource::PathTail => path_tail(&path),
                TargetSource::PathBeforeSuffix(suffix) => path_before_suffix(&path, suffix),
                _ => unreachable!(),
            };
            let Some(id) = id else {
                return Ok((None, request));
            };
            match lookup.resolve(policy.resource(), id).await {
                Ok(Some(target)) => Ok((Some(target), request)),
                Ok(None) => Err(PalisadeError::not_found(policy.resource(), id).into_response()),
                Err(error) => {
                    warn!(policy = policy.name(), %error, "target lookup failed");
                    Err(error.into_response())
                }
            }
        }
        TargetSource::BodyField(field) => {
            let (parts, body) = request.into_parts();
            let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return Err(
                        PalisadeError::validation("request body too large").into_response()
                    );
                }
            };
            let field_value = serde_json::from_slice::<serde_json::Value>(&bytes)
                .ok()
                .and_then(|v| v.get(field).and_then(|f| f.as_str()).map(String::from));
            let target = field_value.map(|id| ResourceRef::prospective(Some(UserId::new(id))));
            let request = Request::from_parts(parts, Body::from(bytes));
            Ok((target, request))
        }
    }
}

async fn record_denial(
    audit: &Arc<dyn AuditSink>,
    principal: &Principal,
    policy: &AccessPolicy,
    reason: DenyReason,
) {
    counter!(
        "palisade_authz_denials_total",
        "policy" => policy.name(),
        "reason" => reason.code(),
    )
    .increment(1);
    let event = AuditEvent::new(
        AuditLevel::Warning,
        AuditAction::Access,
        principal,
        policy.resource(),
        format!("denied by policy {}: {}", policy.name(), reason.message()),
    )
    .with_metadata("policy", serde_json::json!(policy.name()))
    .with_metadata("reason", serde_json::json!(reason));
    audit.record(event).await;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
