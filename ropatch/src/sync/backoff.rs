use std::time::Duration;

/// Linear retry delays: `base`, `2*base`, `3*base`, ...
///
/// The retry budget is small and bounded, so linear growth is enough; an
/// exponential curve would only stretch the tail of a five-element schedule.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    base: Duration,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_grow_linearly() {
        let backoff = Backoff::new(Duration::from_secs(1));
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(2), Duration::from_secs(2));
        assert_eq!(backoff.delay(5), Duration::from_secs(5));
    }

    #[test]
    fn attempt_zero_still_waits_one_base_unit() {
        let backoff = Backoff::new(Duration::from_millis(250));
        assert_eq!(backoff.delay(0), Duration::from_millis(250));
    }
}
