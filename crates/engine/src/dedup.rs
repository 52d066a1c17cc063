//! Process-wide record of which token addresses have already been alerted.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

pub const DEFAULT_SEEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_SEEN_CAPACITY: usize = 50_000;

/// Bounded set of claimed addresses.
///
/// A claim lives for `ttl`; after that the address may be claimed again.
/// When more than `capacity` claims are held, the oldest are evicted first.
#[derive(Debug)]
pub struct SeenSet {
    claims: DashMap<String, Instant>,
    ttl: Duration,
    capacity: usize,
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_TTL, DEFAULT_SEEN_CAPACITY)
    }
}

impl SeenSet {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            claims: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Claim `address` for the caller. Returns true for exactly one caller
    /// per live claim, however many race on the same address.
    pub fn try_claim(&self, address: &str) -> bool {
        self.try_claim_at(address, Instant::now())
    }

    pub fn try_claim_at(&self, address: &str, now: Instant) -> bool {
        // The shard lock is held from lookup to insert.
        let claimed = match self.claims.entry(address.to_string()) {
            Entry::Occupied(mut entry) => {
                if self.is_expired(*entry.get(), now) {
                    entry.insert(now);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                true
            }
        };

        if claimed && self.claims.len() > self.capacity {
            self.evict(address, now);
        }
        claimed
    }

    /// Whether `address` holds a live claim.
    pub fn has_seen(&self, address: &str) -> bool {
        self.has_seen_at(address, Instant::now())
    }

    pub fn has_seen_at(&self, address: &str, now: Instant) -> bool {
        self.claims
            .get(address)
            .is_some_and(|claimed_at| !self.is_expired(*claimed_at, now))
    }

    pub fn mark_seen(&self, address: &str) {
        self.try_claim(address);
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Drop every expired claim. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    pub fn prune_expired_at(&self, now: Instant) -> usize {
        let before = self.claims.len();
        self.claims
            .retain(|_, claimed_at| !self.is_expired(*claimed_at, now));
        before.saturating_sub(self.claims.len())
    }

    fn is_expired(&self, claimed_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(claimed_at) >= self.ttl
    }

    fn evict(&self, keep: &str, now: Instant) {
        let pruned = self.prune_expired_at(now);
        let excess = self.claims.len().saturating_sub(self.capacity);
        if excess == 0 {
            debug!(pruned, "SeenSet: pruned expired claims");
            return;
        }

        let mut oldest: Vec<(String, Instant)> = self
            .claims
            .iter()
            .filter(|entry| entry.key() != keep)
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        oldest.sort_by_key(|(_, claimed_at)| *claimed_at);

        for (address, _) in oldest.into_iter().take(excess) {
            self.claims.remove(&address);
        }
        debug!(pruned, evicted = excess, "SeenSet: over capacity");
    }
}
