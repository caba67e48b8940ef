use jiff::Timestamp;
use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::Error;

/// Structured events for one credential refresh attempt.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    endpoint: String,
}

impl RefreshTelemetry {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            endpoint: endpoint.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn emit_start(&self, at: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            endpoint = %self.endpoint,
            timestamp = %at,
            "refresh.start"
        );
    }

    pub fn emit_success(&self, expires_at: Timestamp) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            endpoint = %self.endpoint,
            expires_at = %expires_at,
            "refresh.success"
        );
    }

    pub fn emit_empty(&self) {
        event!(
            Level::WARN,
            attempt_id = %self.attempt_id,
            endpoint = %self.endpoint,
            "refresh.empty"
        );
    }

    pub fn emit_failure(&self, error: &Error) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            endpoint = %self.endpoint,
            error = %error,
            "refresh.failure"
        );
    }
}
