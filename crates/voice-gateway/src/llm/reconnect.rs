//! Reconnect policy for the LLM realtime socket (spec §4.1 "LLM reconnect").
//!
//! Linear, not exponential: the source's observed schedule is attempt × 1 s,
//! capped at three attempts.

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct ReconnectBackoff {
    pub max_attempts: u32,
}

impl ReconnectBackoff {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Delay before the (1-indexed) `attempt`-th reconnect: `attempt` seconds.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        Duration::from_secs(attempt as u64)
    }

    pub fn should_give_up(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_linearly_by_one_second() {
        let p = ReconnectBackoff::new(3);
        assert_eq!(p.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(p.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(p.delay_for_attempt(3), Duration::from_secs(3));
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let p = ReconnectBackoff::new(3);
        assert!(!p.should_give_up(2));
        assert!(p.should_give_up(3));
        assert!(p.should_give_up(4));
    }
}
