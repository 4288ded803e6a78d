//! Proxy configuration

use gmproxy_core::CallIdStrategy;
use std::time::Duration;

/// Configuration for one proxy endpoint
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Default timeout for remote calls; `None` waits forever
    pub call_timeout: Option<Duration>,
    /// How call ids are generated
    pub call_ids: CallIdStrategy,
}

impl ProxyConfig {
    /// Config with a default call timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            call_timeout: Some(timeout),
            ..Default::default()
        }
    }

    /// Use random call ids instead of the per-channel counter
    pub fn random_ids(mut self) -> Self {
        self.call_ids = CallIdStrategy::Random;
        self
    }
}
