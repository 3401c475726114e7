//! Engine tuning parameters

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`Printer`](super::Printer) engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of pending commands
    pub queue_capacity: usize,
    /// Silence while offline before a temperature probe is written, in seconds
    pub offline_timeout_secs: u64,
    /// Silence while online before the link is declared lost, in seconds
    pub online_timeout_secs: u64,
    /// Bounded wait for queue and link polling, in milliseconds
    pub poll_interval_ms: u64,
    /// Send cycles allowed per command before the engine gives up
    pub max_send_attempts: u32,
    /// How long close waits for the engine thread, in seconds
    pub join_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            offline_timeout_secs: 10,
            online_timeout_secs: 10,
            poll_interval_ms: 10,
            max_send_attempts: 30,
            join_timeout_secs: 30,
        }
    }
}

impl EngineConfig {
    /// Offline keep-alive interval
    pub fn offline_timeout(&self) -> Duration {
        Duration::from_secs(self.offline_timeout_secs)
    }

    /// Online silence limit
    pub fn online_timeout(&self) -> Duration {
        Duration::from_secs(self.online_timeout_secs)
    }

    /// Poll interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Shutdown join limit
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }

    /// Set the queue capacity
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set the send budget per command
    pub fn with_max_send_attempts(mut self, attempts: u32) -> Self {
        self.max_send_attempts = attempts;
        self
    }

    /// Set the shutdown join limit
    pub fn with_join_timeout_secs(mut self, secs: u64) -> Self {
        self.join_timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.offline_timeout(), Duration::from_secs(10));
        assert_eq!(config.online_timeout(), Duration::from_secs(10));
        assert_eq!(config.poll_interval(), Duration::from_millis(10));
        assert_eq!(config.max_send_attempts, 30);
        assert_eq!(config.join_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_queue_capacity(2)
            .with_max_send_attempts(3)
            .with_join_timeout_secs(1);
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.max_send_attempts, 3);
        assert_eq!(config.join_timeout(), Duration::from_secs(1));
    }
}
