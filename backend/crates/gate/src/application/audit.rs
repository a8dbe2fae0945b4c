//! Audit Event Sink
//!
//! Every orchestrator outcome produces one structured event. Events flow
//! through a single injectable sink; a disabled sink drops them silently.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::Utc;
use serde::Serialize;

use crate::application::config::AuditFormat;

/// Audit event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Login,
    LoginFailure,
    Logout,
    VerifyCodeSend,
    VerifyCodeCheck,
    SessionCreate,
    SessionDestroy,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Login => "login",
            EventType::LoginFailure => "login_failure",
            EventType::Logout => "logout",
            EventType::VerifyCodeSend => "verify_code_send",
            EventType::VerifyCodeCheck => "verify_code_check",
            EventType::SessionCreate => "session_create",
            EventType::SessionDestroy => "session_destroy",
        }
    }
}

/// Outcome recorded on the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Success,
    Failure,
}

impl AuditResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditResult::Success => "success",
            AuditResult::Failure => "failure",
        }
    }
}

/// One audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub result: AuditResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl AuditEvent {
    pub fn new(event_type: EventType, result: AuditResult, ip: Option<IpAddr>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            event_type,
            user_id: None,
            method: None,
            ip: ip.map(|ip| ip.to_string()),
            channel: None,
            destination: None,
            result,
            reason: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        if !user_id.is_empty() {
            self.user_id = Some(user_id);
        }
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Injectable audit sink. Writes through `tracing` under the `audit`
/// target so the subscriber decides the final destination.
#[derive(Debug, Clone)]
pub struct AuditSink {
    enabled: bool,
    format: AuditFormat,
}

impl AuditSink {
    pub fn new(enabled: bool, format: AuditFormat) -> Self {
        Self { enabled, format }
    }

    pub fn disabled() -> Self {
        Self::new(false, AuditFormat::Json)
    }

    pub fn emit(&self, event: AuditEvent) {
        if !self.enabled {
            return;
        }

        match self.format {
            AuditFormat::Json => match serde_json::to_string(&event) {
                Ok(line) => tracing::info!(target: "audit", "{line}"),
                Err(e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
            },
            AuditFormat::Text => {
                tracing::info!(
                    target: "audit",
                    "{} {} result={} user={} method={} ip={} reason={}",
                    event.timestamp,
                    event.event_type.as_str(),
                    event.result.as_str(),
                    event.user_id.as_deref().unwrap_or("-"),
                    event.method.as_deref().unwrap_or("-"),
                    event.ip.as_deref().unwrap_or("-"),
                    event.reason.as_deref().unwrap_or("-"),
                );
            }
        }
    }
}
