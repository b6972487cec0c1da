//! Handler configuration

use std::time::Duration;

/// Tunables for the uplink collation engine
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// Collection window: duplicates of one frame arriving within this
    /// delay of the first copy are bundled together
    pub buffer_delay: Duration,
    /// How long a closed fingerprint is remembered so that late
    /// duplicates are rejected instead of opening a fresh window
    pub closed_retention: Duration,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            buffer_delay: Duration::from_millis(100),
            closed_retention: Duration::from_secs(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        let config = HandlerConfig::default();
        assert_eq!(config.buffer_delay, Duration::from_millis(100));
        assert!(config.closed_retention > config.buffer_delay);
    }
}
