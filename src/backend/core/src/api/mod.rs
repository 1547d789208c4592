//! HTTP API.
//!
//! REST surface under `/api/v1`, served by Axum. Every route is wrapped by
//! the identity layer and a per-route authorization layer; handlers only
//! run for requests that passed their policy.

mod handlers;
pub mod routes;

use std::sync::Arc;

use crate::audit::MemoryAuditLog;
use crate::services::{PostService, UserService};

pub use routes::api_router;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub users: UserService,
    pub posts: PostService,
    pub audit_log: Arc<MemoryAuditLog>,
}

/// API response wrapper.
#[derive(serde::Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_envelope_shape() {
        let json = serde_json::to_value(ApiResponse::success("payload")).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], "payload");
    }
}
