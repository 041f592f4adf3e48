//! Signal replay protection
//!
//! Remembers recently executed signal ids so a duplicate can never run
//! twice. Entries expire after a TTL that must exceed the longest leg2
//! timeout, otherwise a retried signal could race its own unwind. Pruning
//! is lazy, on lookup.
//!
//! Author: AI-Generated
//! Created: 2026-02-24

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use uuid::Uuid;

pub struct ReplayGuard {
    ttl: Duration,
    seen: HashMap<Uuid, DateTime<Utc>>,
}

impl ReplayGuard {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds),
            seen: HashMap::new(),
        }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.seen.retain(|_, stamp| now - *stamp < ttl);
    }

    /// Returns true if the id is fresh (and records it); false on replay.
    pub fn check_and_record(&mut self, id: Uuid, now: DateTime<Utc>) -> bool {
        self.prune(now);
        if self.seen.contains_key(&id) {
            return false;
        }
        self.seen.insert(id, now);
        true
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rejected() {
        let mut guard = ReplayGuard::new(60);
        let id = Uuid::new_v4();
        let now = Utc::now();
        assert!(guard.check_and_record(id, now));
        assert!(!guard.check_and_record(id, now + Duration::seconds(1)));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let mut guard = ReplayGuard::new(60);
        let id = Uuid::new_v4();
        let now = Utc::now();
        assert!(guard.check_and_record(id, now));
        assert!(guard.check_and_record(id, now + Duration::seconds(61)));
    }

    #[test]
    fn test_lazy_prune_bounds_memory() {
        let mut guard = ReplayGuard::new(60);
        let now = Utc::now();
        for _ in 0..100 {
            guard.check_and_record(Uuid::new_v4(), now);
        }
        assert_eq!(guard.tracked(), 100);
        guard.check_and_record(Uuid::new_v4(), now + Duration::seconds(120));
        assert_eq!(guard.tracked(), 1);
    }
}
