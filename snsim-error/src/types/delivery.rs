use thiserror::Error;

use crate::{ErrorClass, ErrorExt, StatusCode};

/// Errors produced by one delivery attempt sequence.
///
/// These never reach the publisher. The delivery engine records them in the
/// activity log and the process log only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Retry-eligible: transport failure, HTTP 5xx, 429 or 408.
    #[error("{reason}")]
    Transient { status: Option<u16>, reason: String },

    /// Terminal: any other non-2xx answer, or a failed single-shot protocol.
    #[error("{reason}")]
    Permanent { status: Option<u16>, reason: String },

    /// Every attempt failed with a transient error.
    #[error("delivery failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<DeliveryError>,
    },

    #[error("delivery cancelled")]
    Cancelled,

    #[error("failed to serialize message: {0}")]
    Serialization(String),
}

impl DeliveryError {
    /// Transport-level failure (connect, timeout, reset).
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        Self::Transient {
            status: None,
            reason: format!("HTTP request failed: {reason}"),
        }
    }

    /// Classifies a non-2xx HTTP answer.
    pub fn from_status(
        status: u16,
        body: &str,
    ) -> Self {
        let reason = format!("endpoint returned status {status}: {body}");
        if is_retryable_status(status) {
            Self::Transient {
                status: Some(status),
                reason,
            }
        } else {
            Self::Permanent {
                status: Some(status),
                reason,
            }
        }
    }

    /// Whether another attempt may be made after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// HTTP status returned by the endpoint, if the failure carried one.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Transient { status, .. } | Self::Permanent { status, .. } => *status,
            Self::Exhausted { last, .. } => last.http_status(),
            _ => None,
        }
    }
}

/// 5xx, 429 Too Many Requests and 408 Request Timeout are worth retrying.
pub fn is_retryable_status(status: u16) -> bool {
    (500..600).contains(&status) || status == 429 || status == 408
}

impl ErrorExt for DeliveryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Transient {
                status: Some(429), ..
            } => StatusCode::RateLimited,
            Self::Transient {
                status: Some(408), ..
            } => StatusCode::Timeout,
            Self::Transient { .. } => StatusCode::EndpointUnavailable,
            Self::Permanent { .. } => StatusCode::EndpointRejected,
            Self::Exhausted { .. } => StatusCode::RetriesExhausted,
            Self::Cancelled => StatusCode::Cancelled,
            Self::Serialization(_) => StatusCode::SerializationFailed,
        }
    }

    fn class(&self) -> ErrorClass {
        if self.is_retryable() {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "delivery".to_string()),
            ("status_code", self.status_code().to_string()),
            ("error_class", self.class().to_string()),
        ];
        if let Some(status) = self.http_status() {
            tags.push(("http_status", status.to_string()));
        }
        if let Self::Exhausted { attempts, .. } = self {
            tags.push(("attempts", attempts.to_string()));
        }
        tags
    }
}
