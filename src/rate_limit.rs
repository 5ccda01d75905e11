//! Rate limiting for the login endpoint.
//!
//! Uses a token bucket per submitted username. The key is the normalised name
//! whether or not the account exists, so the limiter itself never reveals
//! which usernames are real.

use std::num::NonZeroU32;

use governor::{Quota, RateLimiter, clock::DefaultClock, state::keyed::DefaultKeyedStateStore};

/// Default login attempts allowed per username per minute.
pub const DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE: u32 = 10;

/// Per-username rate limiter.
pub type UsernameLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

pub struct LoginRateLimiter {
    limiter: UsernameLimiter,
}

impl LoginRateLimiter {
    /// Allow `per_minute` attempts per username, bursting up to the same amount.
    /// A zero limit is raised to one.
    pub fn new(per_minute: u32) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
        }
    }

    /// Record an attempt for `username`. Returns false when the bucket is empty.
    pub fn check(&self, username: &str) -> bool {
        self.limiter.check_key(&normalize(username)).is_ok()
    }

    /// Forget usernames whose bucket has fully refilled. Their state is
    /// indistinguishable from a fresh key, so limits are unaffected.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    /// Number of usernames currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.limiter.len()
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_ATTEMPTS_PER_MINUTE)
    }
}

fn normalize(username: &str) -> String {
    username.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_per_username() {
        let limiter = LoginRateLimiter::new(3);

        assert!(limiter.check("alice"));
        assert!(limiter.check("Alice"));
        assert!(limiter.check(" ALICE "));
        assert!(!limiter.check("alice"));

        // Other keys have their own bucket
        assert!(limiter.check("ghost"));
    }

    #[test]
    fn test_prune_drops_refilled_keys() {
        // One cell per millisecond, so a single attempt refills almost at once
        let limiter = LoginRateLimiter::new(60_000);
        for i in 0..100 {
            assert!(limiter.check(&format!("user-{}", i)));
        }
        assert_eq!(limiter.tracked_keys(), 100);

        std::thread::sleep(std::time::Duration::from_millis(50));
        limiter.prune();

        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_prune_keeps_limited_keys() {
        let limiter = LoginRateLimiter::new(1);
        assert!(limiter.check("alice"));

        limiter.prune();

        assert_eq!(limiter.tracked_keys(), 1);
        assert!(!limiter.check("alice"));
    }

    #[test]
    fn test_zero_limit_still_allows_one() {
        let limiter = LoginRateLimiter::new(0);
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
    }
}
