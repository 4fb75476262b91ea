//! Sliding-window rate limiter for the login endpoint.
//!
//! Guards the endpoint itself against brute force, independently of the
//! per-account lockout: keyed by (normalized document, source address).

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::account::normalize_document;

/// Default policy: 5 attempts per rolling minute.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("too many attempts; retry in {retry_after_secs}s")]
pub struct RateLimited {
    pub retry_after_secs: u64,
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    window: Duration,
    max_attempts: u32,
    attempts: Mutex<HashMap<(String, IpAddr), VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            window,
            max_attempts,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Registers one attempt, rejecting it if the key already exhausted the
    /// window. Rejected attempts do not extend the window.
    pub fn check(&self, document: &str, source: IpAddr) -> Result<(), RateLimited> {
        let key = (normalize_document(document), source);
        let now = Instant::now();

        let mut attempts = self.attempts.lock().unwrap_or_else(PoisonError::into_inner);
        let entries = attempts.entry(key).or_default();

        while let Some(front) = entries.front() {
            if now.duration_since(*front) >= self.window {
                entries.pop_front();
            } else {
                break;
            }
        }

        if entries.len() >= self.max_attempts as usize {
            let oldest = entries
                .front()
                .copied()
                .unwrap_or(now);
            let elapsed = now.duration_since(oldest);
            let remaining = self.window.saturating_sub(elapsed);
            return Err(RateLimited {
                // Round up so "retry in 0s" never shows while still limited.
                retry_after_secs: remaining.as_secs().max(1),
            });
        }

        entries.push_back(now);
        Ok(())
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_WINDOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    #[test]
    fn sixth_attempt_within_window_is_limited() {
        let limiter = SlidingWindowLimiter::default();
        for _ in 0..5 {
            limiter.check("100", ip(1)).unwrap();
        }
        let err = limiter.check("100", ip(1)).unwrap_err();
        assert!(err.retry_after_secs >= 1);
        assert!(err.retry_after_secs <= 60);
    }

    #[test]
    fn keys_are_independent_per_source_address() {
        let limiter = SlidingWindowLimiter::default();
        for _ in 0..5 {
            limiter.check("100", ip(1)).unwrap();
        }
        // Same document from another address still passes.
        limiter.check("100", ip(2)).unwrap();
        // Another document from the saturated address also passes.
        limiter.check("200", ip(1)).unwrap();
    }

    #[test]
    fn window_expiry_frees_the_key() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_millis(30));
        limiter.check("100", ip(1)).unwrap();
        limiter.check("100", ip(1)).unwrap();
        assert!(limiter.check("100", ip(1)).is_err());

        std::thread::sleep(Duration::from_millis(40));
        limiter.check("100", ip(1)).unwrap();
    }
}
