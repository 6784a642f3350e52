//! # Liveness tracker.
//!
//! Keeps one [`LivenessRecord`] per alive tag and decides whether an alive signal
//! is fresh and whether a running timer has expired.
//!
//! ## Rules
//! - A signal is stale when `arrival - signal_ts > tolerance_factor × interval`.
//! - `last_seen` only moves forward.
//! - Only active timers expire; expiry deactivates the timer, so one silence
//!   produces one expiry.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::entity::EntityKey;
use crate::error::SupervisionError;

/// Liveness state of one alive tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessRecord {
    pub alive_tag_id: u64,
    pub owner: EntityKey,
    pub last_seen_millis: u64,
    pub expected_interval_millis: u64,
    /// Timer running.
    pub active: bool,
}

/// Freshness of an alive signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliveVerdict {
    Accepted,
    Stale { delay_millis: u64 },
}

/// A timer found silent for longer than its interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expiry {
    pub alive_tag_id: u64,
    pub owner: EntityKey,
    pub last_seen_millis: u64,
}

/// Concurrent map of alive tag id → [`LivenessRecord`].
pub struct LivenessTracker {
    records: DashMap<u64, LivenessRecord>,
    by_owner: DashMap<EntityKey, u64>,
    tolerance_factor: u64,
}

impl LivenessTracker {
    pub fn new(tolerance_factor: u64) -> Self {
        Self {
            records: DashMap::new(),
            by_owner: DashMap::new(),
            tolerance_factor,
        }
    }

    /// Registers an inactive timer for `owner`.
    pub fn register(
        &self,
        alive_tag_id: u64,
        owner: EntityKey,
        interval_millis: u64,
    ) -> Result<(), SupervisionError> {
        if interval_millis == 0 {
            return Err(SupervisionError::InvalidConfiguration {
                reason: format!("alive tag {alive_tag_id} of {owner} has a zero interval"),
            });
        }
        match self.records.entry(alive_tag_id) {
            Entry::Occupied(_) => Err(SupervisionError::AlreadyConfigured {
                what: "alive tag",
                id: alive_tag_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(LivenessRecord {
                    alive_tag_id,
                    owner,
                    last_seen_millis: 0,
                    expected_interval_millis: interval_millis,
                    active: false,
                });
                self.by_owner.insert(owner, alive_tag_id);
                Ok(())
            }
        }
    }

    pub fn deregister(&self, alive_tag_id: u64) -> Option<LivenessRecord> {
        let (_, record) = self.records.remove(&alive_tag_id)?;
        self.by_owner.remove_if(&record.owner, |_, id| *id == alive_tag_id);
        Some(record)
    }

    pub fn is_registered(&self, alive_tag_id: u64) -> bool {
        self.records.contains_key(&alive_tag_id)
    }

    pub fn alive_tag_of(&self, owner: EntityKey) -> Option<u64> {
        self.by_owner.get(&owner).map(|id| *id)
    }

    /// Snapshot of one record.
    pub fn record(&self, alive_tag_id: u64) -> Option<LivenessRecord> {
        self.records.get(&alive_tag_id).map(|r| r.clone())
    }

    /// Classifies an alive signal and, when fresh, records it and activates the timer.
    ///
    /// Returns `None` for an unregistered tag.
    pub fn observe(
        &self,
        alive_tag_id: u64,
        signal_ts: u64,
        arrival_ts: u64,
    ) -> Option<(EntityKey, AliveVerdict)> {
        let mut record = self.records.get_mut(&alive_tag_id)?;
        let delay = arrival_ts.saturating_sub(signal_ts);
        let limit = self
            .tolerance_factor
            .saturating_mul(record.expected_interval_millis);
        if delay > limit {
            return Some((record.owner, AliveVerdict::Stale { delay_millis: delay }));
        }
        record.last_seen_millis = record.last_seen_millis.max(signal_ts);
        record.active = true;
        Some((record.owner, AliveVerdict::Accepted))
    }

    /// Moves `last_seen` forward without classifying; returns `false` if unknown.
    pub fn refresh(&self, alive_tag_id: u64, ts: u64) -> bool {
        match self.records.get_mut(&alive_tag_id) {
            Some(mut r) => {
                r.last_seen_millis = r.last_seen_millis.max(ts);
                true
            }
            None => false,
        }
    }

    /// Activates the timer of `owner`, counting its interval from `now`.
    pub fn start_timer(&self, owner: EntityKey, now: u64) -> bool {
        let Some(id) = self.alive_tag_of(owner) else {
            return false;
        };
        match self.records.get_mut(&id) {
            Some(mut r) => {
                r.last_seen_millis = r.last_seen_millis.max(now);
                r.active = true;
                true
            }
            None => false,
        }
    }

    pub fn stop_timer(&self, owner: EntityKey) -> bool {
        let Some(id) = self.alive_tag_of(owner) else {
            return false;
        };
        match self.records.get_mut(&id) {
            Some(mut r) => {
                r.active = false;
                true
            }
            None => false,
        }
    }

    /// Deactivates and returns every active timer silent for longer than its interval.
    pub fn expired(&self, now: u64) -> Vec<Expiry> {
        let mut out: Vec<Expiry> = self
            .records
            .iter_mut()
            .filter_map(|mut r| {
                if r.active && now.saturating_sub(r.last_seen_millis) > r.expected_interval_millis {
                    r.active = false;
                    Some(Expiry {
                        alive_tag_id: r.alive_tag_id,
                        owner: r.owner,
                        last_seen_millis: r.last_seen_millis,
                    })
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable_by_key(|e| e.alive_tag_id);
        out
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
