//! Audit logging.
//!
//! Denials and mutating operations are recorded as structured
//! [`AuditEvent`]s through an [`AuditSink`]. Delivery is fire-and-forget:
//! a failed or absent sink never changes an authorization outcome or
//! blocks a response.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::rbac::{Principal, Resource};

/// Severity of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditLevel {
    Info,
    Warning,
    Error,
}

/// What the principal was doing when the event was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Publish,
    Access,
}

/// One audit record. Fixed schema with an optional free-form metadata map
/// for anything operation-specific.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    pub action: AuditAction,
    pub user_id: String,
    pub user_role: String,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl AuditEvent {
    pub fn new(
        level: AuditLevel,
        action: AuditAction,
        principal: &Principal,
        resource: Resource,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            action,
            user_id: principal.id.to_string(),
            user_role: principal.role.to_string(),
            resource_type: resource.to_string(),
            resource_id: None,
            description: description.into(),
            metadata: None,
        }
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata
                .get_or_insert_with(HashMap::new)
                .insert(key.into(), v);
        }
        self
    }
}

/// Destination for audit events. Implementations must never let a
/// delivery failure propagate back to the caller.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Sink that forwards events over a bounded channel to a background task
/// which writes them to the `audit` tracing target. A full channel drops
/// the event with a warning rather than blocking the request path.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditSink {
    pub fn new(buffer: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(buffer);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                info!(
                    target: "audit",
                    level = ?event.level,
                    action = ?event.action,
                    user_id = %event.user_id,
                    user_role = %event.user_role,
                    resource_type = %event.resource_type,
                    resource_id = event.resource_id.as_deref().unwrap_or(""),
                    "{}",
                    event.description
                );
            }
        });
        Self { sender }
    }
}

#[async_trait]
impl AuditSink for ChannelAuditSink {
    async fn record(&self, event: AuditEvent) {
        if let Err(err) = self.sender.try_send(event) {
            warn!("audit event dropped: {}", err);
        }
    }
}

/// Sink used when audit logging is disabled. Its absence must not change
/// authorization outcomes, so it simply discards everything.
#[derive(Debug, Clone, Default)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _event: AuditEvent) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// Queryable retention
// ═══════════════════════════════════════════════════════════════════════════════

/// Query parameters for the retained log.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    pub user_id: Option<String>,
    pub resource_type: Option<String>,
    pub action: Option<AuditAction>,
    pub level: Option<AuditLevel>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// One page of retained audit events, newest first.
#[derive(Debug, Serialize)]
pub struct LogPage {
    pub logs: Vec<AuditEvent>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

const DEFAULT_PAGE_SIZE: usize = 50;

/// Sink that keeps the most recent events in memory for the log-read API,
/// in addition to writing them to the `audit` tracing target. Retention is
/// bounded; the oldest events are evicted first.
#[derive(Debug)]
pub struct MemoryAuditLog {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl MemoryAuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    pub fn query(&self, filter: &LogFilter) -> LogPage {
        let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = filter.offset.unwrap_or(0);
        let events = self.events.lock().unwrap_or_else(|e| e.into_inner());

        let matching: Vec<&AuditEvent> = events
            .iter()
            .rev()
            .filter(|event| Self::matches(event, filter))
            .collect();
        let total = matching.len();
        let logs = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        LogPage {
            logs,
            total,
            limit,
            offset,
        }
    }

    fn matches(event: &AuditEvent, filter: &LogFilter) -> bool {
        if filter.user_id.as_ref().is_some_and(|u| event.user_id != *u) {
            return false;
        }
        if filter
            .resource_type
            .as_ref()
            .is_some_and(|r| event.resource_type != *r)
        {
            return false;
        }
        if filter.action.is_some_and(|a| event.action != a) {
            return false;
        }
        if filter.level.is_some_and(|l| event.level != l) {
            return false;
        }
        true
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, event: AuditEvent) {
        info!(
            target: "audit",
            level = ?event.level,
            action = ?event.action,
            user_id = %event.user_id,
            user_role = %event.user_role,
            resource_type = %event.resource_type,
            resource_id = event.resource_id.as_deref().unwrap_or(""),
            "{}",
            event.description
        );
        let mut events = self.events.lock().unwrap_or_else(|e| e.into_inner());
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
