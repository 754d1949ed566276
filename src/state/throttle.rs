use std::time::Duration;

use tokio::time::Instant;

/// Local lockout applied after a buzz attempt while the buzzer was closed.
#[derive(Debug, Clone)]
pub struct BuzzerThrottle {
    window: Duration,
    until: Option<Instant>,
}

impl BuzzerThrottle {
    /// Throttle that suppresses attempts for `window` once engaged.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            until: None,
        }
    }

    /// Whether attempts are currently suppressed. Clears itself once the window has elapsed.
    pub fn is_throttled(&mut self, now: Instant) -> bool {
        match self.until {
            Some(until) if now < until => true,
            Some(_) => {
                self.until = None;
                false
            }
            None => false,
        }
    }

    /// Start a new lockout window from `now`.
    pub fn engage(&mut self, now: Instant) {
        self.until = Some(now + self.window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lockout_expires_after_window() {
        let start = Instant::now();
        let mut throttle = BuzzerThrottle::new(Duration::from_millis(500));
        assert!(!throttle.is_throttled(start));
        throttle.engage(start);
        assert!(throttle.is_throttled(start + Duration::from_millis(100)));
        assert!(throttle.is_throttled(start + Duration::from_millis(499)));
        assert!(!throttle.is_throttled(start + Duration::from_millis(600)));
        assert!(!throttle.is_throttled(start + Duration::from_millis(100)));
    }
}
