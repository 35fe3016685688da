use std::error::Error;

use crate::{ErrorClass, StatusCode};

/// Extension for library errors (object-safe).
///
/// Gives every error in the workspace a status code, a client-safe message
/// for the wire adapter and a set of tags for structured logs.
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Protocol status. Defaults to [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Coarse class of the error, derived from the status code.
    fn class(&self) -> ErrorClass {
        self.status_code().class()
    }

    /// Message safe to hand to a client.
    ///
    /// Internal errors collapse to `"Internal server error"`.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Unknown | StatusCode::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Key/value tags for metrics and structured logs.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", short_type_name::<Self>().to_string()),
            ("status_code", self.status_code().to_string()),
            ("error_class", self.class().to_string()),
        ]
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct DefaultError(pub &'static str);

    impl fmt::Display for DefaultError {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "DefaultError: {}", self.0)
        }
    }

    impl Error for DefaultError {}

    impl ErrorExt for DefaultError {}

    #[derive(Debug)]
    struct MissingTopic(pub &'static str);

    impl fmt::Display for MissingTopic {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "topic not found: {}", self.0)
        }
    }

    impl Error for MissingTopic {}

    impl ErrorExt for MissingTopic {
        fn status_code(&self) -> StatusCode {
            StatusCode::TopicNotFound
        }
    }

    /// Without an override the status is `Internal` and the client message is
    /// the safe placeholder.
    #[test]
    fn test_default_status_is_internal() {
        let e = DefaultError("secret");
        assert_eq!(e.status_code(), StatusCode::Internal);
        assert_eq!(e.client_message(), "Internal server error");
    }

    #[test]
    fn test_client_message_non_internal() {
        let e = MissingTopic("orders");
        assert_eq!(e.client_message(), "topic not found: orders");
        assert_eq!(e.class(), ErrorClass::NotFound);
    }

    #[test]
    fn test_metrics_tags_contain_class() {
        let tags = MissingTopic("t").metrics_tags();
        assert!(tags
            .iter()
            .any(|(k, v)| *k == "error_class" && v == "not_found"));
        assert!(tags
            .iter()
            .any(|(k, v)| *k == "error_type" && v == "MissingTopic"));
    }
}
