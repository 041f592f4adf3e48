//! Execution circuit breaker
//!
//! Sliding window of failure timestamps. When the window holds at least
//! `failure_threshold` failures the breaker opens, rejecting everything
//! until `cooldown_seconds` has elapsed; reopening resets the window so one
//! old failure cannot immediately re-trip it.
//!
//! Author: AI-Generated
//! Created: 2026-02-24

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tracing::{info, warn};

pub struct CircuitBreaker {
    failure_threshold: usize,
    window: Duration,
    cooldown: Duration,
    failures: VecDeque<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize, window_seconds: i64, cooldown_seconds: i64) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            window: Duration::seconds(window_seconds),
            cooldown: Duration::seconds(cooldown_seconds),
            failures: VecDeque::new(),
            opened_at: None,
        }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        while let Some(front) = self.failures.front() {
            if now - *front > self.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }

    /// Open means "reject the attempt". An open breaker closes itself once
    /// the cooldown has elapsed, clearing its failure history.
    pub fn is_open(&mut self, now: DateTime<Utc>) -> bool {
        if let Some(opened) = self.opened_at {
            if now - opened < self.cooldown {
                return true;
            }
            info!("circuit breaker cooldown elapsed, closing");
            self.opened_at = None;
            self.failures.clear();
        }
        false
    }

    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failures.push_back(now);
        self.prune(now);
        if self.opened_at.is_none() && self.failures.len() >= self.failure_threshold {
            warn!(
                "🔌 circuit breaker OPEN: {} failures within {}s",
                self.failures.len(),
                self.window.num_seconds()
            );
            self.opened_at = Some(now);
        }
    }

    pub fn record_success(&mut self) {
        self.failures.clear();
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
}
