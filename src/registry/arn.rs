//! Identifier derivation for topics and subscriptions.
//!
//! Identifiers follow the cloud provider's resource-name layout so that client
//! SDKs pointed at the emulator parse them without complaint.

pub const DEFAULT_ACCOUNT_ID: &str = "123456789012";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Account/region pair every identifier in one registry is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArnScope {
    pub account_id: String,
    pub region: String,
}

impl ArnScope {
    /// Empty values fall back to the emulator defaults.
    pub fn new(
        account_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        let account_id = account_id.into();
        let region = region.into();
        Self {
            account_id: if account_id.is_empty() {
                DEFAULT_ACCOUNT_ID.to_string()
            } else {
                account_id
            },
            region: if region.is_empty() {
                DEFAULT_REGION.to_string()
            } else {
                region
            },
        }
    }

    /// `arn:aws:sns:{region}:{account}:{name}`. Same name, same identifier.
    pub fn topic_arn(
        &self,
        name: &str,
    ) -> String {
        format!("arn:aws:sns:{}:{}:{}", self.region, self.account_id, name)
    }

    /// `arn:aws:sns:{region}:{account}:{topic-name}:{seq}`.
    pub fn subscription_arn(
        &self,
        topic_arn: &str,
        seq: u64,
    ) -> String {
        format!(
            "arn:aws:sns:{}:{}:{}:{}",
            self.region,
            self.account_id,
            topic_name(topic_arn),
            seq
        )
    }
}

impl Default for ArnScope {
    fn default() -> Self {
        Self::new(DEFAULT_ACCOUNT_ID, DEFAULT_REGION)
    }
}

/// Last `:`-separated segment of a topic identifier. A bare name is returned
/// unchanged.
pub fn topic_name(topic_arn: &str) -> &str {
    topic_arn
        .rsplit_once(':')
        .map(|(_, name)| name)
        .unwrap_or(topic_arn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_arn_is_deterministic() {
        let scope = ArnScope::new("111122223333", "eu-west-1");
        assert_eq!(
            scope.topic_arn("orders"),
            "arn:aws:sns:eu-west-1:111122223333:orders"
        );
        assert_eq!(scope.topic_arn("orders"), scope.topic_arn("orders"));
    }

    #[test]
    fn test_empty_scope_uses_defaults() {
        let scope = ArnScope::new("", "");
        assert_eq!(scope, ArnScope::default());
        assert_eq!(
            scope.topic_arn("t"),
            "arn:aws:sns:us-east-1:123456789012:t"
        );
    }

    #[test]
    fn test_subscription_arn_uses_topic_name() {
        let scope = ArnScope::default();
        let topic = scope.topic_arn("billing");
        assert_eq!(
            scope.subscription_arn(&topic, 7),
            "arn:aws:sns:us-east-1:123456789012:billing:7"
        );
        assert_eq!(topic_name("plain"), "plain");
    }
}
