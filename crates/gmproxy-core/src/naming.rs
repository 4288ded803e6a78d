//! Event naming and call identifiers
//!
//! Every event a proxy exchanges is namespaced by its channel id:
//! - `{channel}:{method}` carries a call
//! - `{channel}:{method}:{call_id}` carries the matching response

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Event name a call to `method` is published on
pub fn call_event(channel: &str, method: &str) -> String {
    format!("{}:{}", channel, method)
}

/// Event name the response to one call is published on
pub fn response_event(channel: &str, method: &str, call_id: &CallId) -> String {
    format!("{}:{}:{}", channel, method, call_id)
}

/// Correlation token for one in-flight call
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for CallId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for CallId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// How fresh call ids are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallIdStrategy {
    /// Per-channel counter starting at 1
    #[default]
    Counter,
    /// Random v4 UUID, simple (hyphenless) form
    Random,
}

/// Source of unique call ids for one proxy
#[derive(Debug)]
pub struct CallIdGenerator {
    strategy: CallIdStrategy,
    next_id: AtomicU64,
}

impl CallIdGenerator {
    pub fn new(strategy: CallIdStrategy) -> Self {
        Self {
            strategy,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn strategy(&self) -> CallIdStrategy {
        self.strategy
    }

    /// Produce the next call id
    pub fn next_id(&self) -> CallId {
        match self.strategy {
            CallIdStrategy::Counter => CallId::from(self.next_id.fetch_add(1, Ordering::SeqCst)),
            CallIdStrategy::Random => CallId(uuid::Uuid::new_v4().simple().to_string()),
        }
    }
}

impl Default for CallIdGenerator {
    fn default() -> Self {
        Self::new(CallIdStrategy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_event_names() {
        assert_eq!(call_event("door1", "open"), "door1:open");
        assert_eq!(
            response_event("door1", "open", &CallId::from(7)),
            "door1:open:7"
        );
    }

    #[test]
    fn test_counter_is_monotonic() {
        let ids = CallIdGenerator::new(CallIdStrategy::Counter);
        assert_eq!(ids.strategy(), CallIdStrategy::Counter);
        assert_eq!(ids.next_id().as_str(), "1");
        assert_eq!(ids.next_id().as_str(), "2");
        assert_eq!(ids.next_id().as_str(), "3");
    }

    #[test]
    fn test_rapid_ids_never_collide() {
        // Wall-clock millisecond ids collided here; both strategies must not.
        for strategy in [CallIdStrategy::Counter, CallIdStrategy::Random] {
            let ids = CallIdGenerator::new(strategy);
            let seen: HashSet<CallId> = (0..1000).map(|_| ids.next_id()).collect();
            assert_eq!(seen.len(), 1000, "{:?} produced a duplicate", strategy);
        }
    }

    #[test]
    fn test_random_ids_are_event_safe() {
        let id = CallIdGenerator::new(CallIdStrategy::Random).next_id();
        assert_eq!(id.as_str().len(), 32);
        assert!(!id.as_str().contains(':'));
    }
}
