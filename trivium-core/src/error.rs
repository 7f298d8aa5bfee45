use thiserror::Error;

/// Error taxonomy for the sync layer.
///
/// `Network` and `RateLimit` are transient and eligible for retry by the
/// publish queue. `Wallet` and `Transaction` are surfaced immediately — they
/// usually need user action or are terminal for the job. `Validation` is
/// fatal to the single operation and never retried.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by remote surface")]
    RateLimit {
        /// Backoff hint from the remote surface, if it provided one.
        retry_after_ms: Option<u64>,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("wallet error: {0}")]
    Wallet(String),

    #[error("transaction rejected: {0}")]
    Transaction(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("persistence error: {0}")]
    Store(String),
}

impl SyncError {
    /// Whether the publish queue may retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_) | SyncError::RateLimit { .. })
    }

    /// Suggested backoff from the remote surface, if any (rate-limit responses
    /// may carry a Retry-After).
    pub fn retry_hint_ms(&self) -> Option<u64> {
        match self {
            SyncError::RateLimit { retry_after_ms } => *retry_after_ms,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_and_rate_limit_are_retryable() {
        assert!(SyncError::Network("connection reset".into()).is_retryable());
        assert!(SyncError::RateLimit {
            retry_after_ms: Some(500)
        }
        .is_retryable());
        assert!(SyncError::RateLimit {
            retry_after_ms: None
        }
        .is_retryable());
    }

    #[test]
    fn test_fatal_classes_are_not_retryable() {
        assert!(!SyncError::Validation("bad input".into()).is_retryable());
        assert!(!SyncError::Wallet("locked".into()).is_retryable());
        assert!(!SyncError::Transaction("reverted".into()).is_retryable());
        assert!(!SyncError::Store("flush failed".into()).is_retryable());
    }

    #[test]
    fn test_retry_hint_only_on_rate_limit() {
        let e = SyncError::RateLimit {
            retry_after_ms: Some(1200),
        };
        assert_eq!(e.retry_hint_ms(), Some(1200));
        assert_eq!(SyncError::Network("timeout".into()).retry_hint_ms(), None);
    }
}
