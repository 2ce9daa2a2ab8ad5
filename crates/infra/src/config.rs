//! Repository configuration.
//!
//! The core reads no environment variables or files itself; the host process
//! loads this from wherever it keeps configuration (JSON shown here) and hands
//! it to [`crate::repository::AggregateRepository::with_config`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What `save` does when a subscriber fails to handle a notification.
///
/// Either way the events are already durable and the aggregate's pending
/// changes are folded into its history; only the caller's view differs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberFailurePolicy {
    /// Log the failure and keep notifying the remaining subscribers; `save` succeeds.
    #[default]
    LogAndContinue,
    /// Stop notifying and return the failure from `save`.
    FailFast,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    pub subscriber_failure_policy: SubscriberFailurePolicy,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid repository configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl RepositoryConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_subscriber_failure_policy(mut self, policy: SubscriberFailurePolicy) -> Self {
        self.subscriber_failure_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RepositoryConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RepositoryConfig::default());
        assert_eq!(
            config.subscriber_failure_policy,
            SubscriberFailurePolicy::LogAndContinue
        );
    }

    #[test]
    fn parses_fail_fast_policy() {
        let config =
            RepositoryConfig::from_json_str(r#"{ "subscriber_failure_policy": "fail_fast" }"#)
                .unwrap();
        assert_eq!(config.subscriber_failure_policy, SubscriberFailurePolicy::FailFast);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err =
            RepositoryConfig::from_json_str(r#"{ "subscriber_failure_policy": "retry" }"#)
                .unwrap_err();
        assert!(err.to_string().starts_with("invalid repository configuration"));
    }
}
