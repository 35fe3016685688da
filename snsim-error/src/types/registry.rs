use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Errors returned synchronously by the topic/subscription registries and by
/// the control-plane facade.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("topic not found: {arn}")]
    TopicNotFound { arn: String },

    #[error("subscription not found: {arn}")]
    SubscriptionNotFound { arn: String },

    /// A required request field was empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    #[error("invalid protocol: {protocol}")]
    InvalidProtocol { protocol: String },

    #[error("invalid confirmation token")]
    InvalidToken,

    #[error("message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: usize, max: usize },
}

impl RegistryError {
    pub fn topic_not_found(arn: impl Into<String>) -> Self {
        Self::TopicNotFound { arn: arn.into() }
    }

    pub fn subscription_not_found(arn: impl Into<String>) -> Self {
        Self::SubscriptionNotFound { arn: arn.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TopicNotFound { .. } | Self::SubscriptionNotFound { .. }
        )
    }
}

impl ErrorExt for RegistryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::TopicNotFound { .. } => StatusCode::TopicNotFound,
            Self::SubscriptionNotFound { .. } => StatusCode::SubscriptionNotFound,
            Self::MissingField { .. } => StatusCode::MissingField,
            Self::InvalidProtocol { .. } => StatusCode::InvalidProtocol,
            Self::InvalidToken => StatusCode::InvalidToken,
            Self::MessageTooLarge { .. } => StatusCode::MessageTooLarge,
        }
    }

    fn client_message(&self) -> String {
        match self {
            Self::TopicNotFound { .. } => "NotFound: Topic not found".to_string(),
            Self::SubscriptionNotFound { .. } => "NotFound: Subscription not found".to_string(),
            other => other.to_string(),
        }
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "registry".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::TopicNotFound { arn } | Self::SubscriptionNotFound { arn } => {
                tags.push(("arn", arn.clone()));
            }
            Self::MissingField { field } => tags.push(("field", field.to_string())),
            Self::InvalidProtocol { protocol } => tags.push(("protocol", protocol.clone())),
            _ => {}
        }

        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorClass;

    #[test]
    fn test_not_found_class() {
        let err = RegistryError::topic_not_found("arn:aws:sns:us-east-1:1:t");
        assert!(err.is_not_found());
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(err.status_code().http_status(), 404);
        assert_eq!(err.client_message(), "NotFound: Topic not found");
    }

    #[test]
    fn test_validation_class() {
        for err in [
            RegistryError::MissingField { field: "TopicArn" },
            RegistryError::InvalidProtocol {
                protocol: "smtp".into(),
            },
            RegistryError::InvalidToken,
            RegistryError::MessageTooLarge { size: 10, max: 5 },
        ] {
            assert_eq!(err.class(), ErrorClass::Validation, "{err}");
            assert!(!err.is_not_found());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(
            RegistryError::MissingField { field: "Endpoint" }.to_string(),
            "Endpoint is required"
        );
        assert_eq!(
            RegistryError::InvalidToken.to_string(),
            "invalid confirmation token"
        );
    }
}
