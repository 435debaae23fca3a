use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors raised by the analytics layer before any computation happens.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    /// A caller-supplied parameter is outside its accepted range.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AnalyticsError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// External collaborator that produced an [`UpstreamError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Prediction,
    Narrative,
}

/// Failure reported by (or while talking to) an external service.
///
/// Carried inside `anyhow::Error` so callers can `downcast_ref` for the raw body.
#[derive(Debug, Clone)]
pub struct UpstreamError {
    pub service: Service,
    pub stage: &'static str,
    pub detail: String,
    pub raw_output: Option<String>,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "upstream error (service={:?}, stage={}): {}",
            self.service, self.stage, self.detail
        )
    }
}

impl std::error::Error for UpstreamError {}
