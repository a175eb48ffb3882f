use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::interval;

use crate::metrics::TRACKED_CLIENTS;

// Quota settings - how many requests a client gets per window
#[derive(Debug, Clone, Copy)]
pub struct QuotaPolicy {
    pub limit: u32,
    pub window: Duration,
    pub capacity: usize, // max clients tracked at once
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            limit: 20,
            window: Duration::from_secs(6 * 60 * 60),
            capacity: 100_000,
        }
    }
}

// Usage of one client inside its current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRecord {
    pub count: u32,
    pub window_start: Instant,
}

impl QuotaRecord {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) > window
    }

    // nothing left worth keeping
    fn evictable(&self, now: Instant, window: Duration) -> bool {
        self.count == 0 || self.expired(now, window)
    }
}

pub enum Admission<'a> {
    Granted(QuotaPermit<'a>),
    Denied { retry_after: Duration },
}

// One reserved unit - kept on commit, given back on drop
pub struct QuotaPermit<'a> {
    guard: &'a QuotaGuard,
    client_id: String,
    window_start: Instant,
    committed: bool,
}

impl QuotaPermit<'_> {
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for QuotaPermit<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.guard.release(&self.client_id, self.window_start);
        }
    }
}

// Per-client admission, every read-modify-write runs under the client's shard lock
pub struct QuotaGuard {
    records: DashMap<String, QuotaRecord>,
    policy: QuotaPolicy,
    no_room_until: Mutex<Option<Instant>>, // store full of live windows until then
}

impl QuotaGuard {
    pub fn new(policy: QuotaPolicy) -> Self {
        Self {
            records: DashMap::new(),
            policy: QuotaPolicy {
                limit: policy.limit.max(1),
                capacity: policy.capacity.max(1),
                ..policy
            },
            no_room_until: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> QuotaPolicy {
        self.policy
    }

    // read only, never creates a record
    pub fn is_admitted(&self, client_id: &str, now: Instant) -> bool {
        match self.records.get(client_id) {
            None => self.has_room(now),
            Some(record) if record.expired(now, self.policy.window) => true,
            Some(record) => record.count < self.policy.limit,
        }
    }

    // Not idempotent. An expired window restarts with this use as its first count.
    pub fn record_usage(&self, client_id: &str, now: Instant) {
        // usage that already happened is always kept, even over capacity
        let _ = self.make_room(client_id, now);

        let mut record = self
            .records
            .entry(client_id.to_string())
            .or_insert_with(|| QuotaRecord::fresh(now));

        if record.expired(now, self.policy.window) {
            *record = QuotaRecord {
                count: 1,
                window_start: now,
            };
        } else {
            record.count += 1;
        }
    }

    // Atomic check-and-reserve
    pub fn try_acquire(&self, client_id: &str, now: Instant) -> Admission<'_> {
        if let Err(retry_after) = self.make_room(client_id, now) {
            tracing::warn!(client = %client_id, "Quota store full, new client refused");
            return Admission::Denied { retry_after };
        }

        let mut record = self
            .records
            .entry(client_id.to_string())
            .or_insert_with(|| QuotaRecord::fresh(now));

        // window over..? start a new one
        if record.expired(now, self.policy.window) {
            *record = QuotaRecord::fresh(now);
        }

        if record.count >= self.policy.limit {
            let elapsed = now.saturating_duration_since(record.window_start);
            return Admission::Denied {
                retry_after: self.policy.window.saturating_sub(elapsed),
            };
        }

        record.count += 1;
        let window_start = record.window_start;
        drop(record);

        Admission::Granted(QuotaPermit {
            guard: self,
            client_id: client_id.to_string(),
            window_start,
            committed: false,
        })
    }

    fn release(&self, client_id: &str, window_start: Instant) {
        if let Some(mut record) = self.records.get_mut(client_id) {
            // window was reset meanwhile, the unit belongs to the old one
            if record.window_start == window_start && record.count > 0 {
                record.count -= 1;
            }
        }
    }

    // Drops expired and unused records, returns how many went
    pub fn sweep(&self, now: Instant) -> usize {
        self.sweep_tracking_oldest(now).0
    }

    fn sweep_tracking_oldest(&self, now: Instant) -> (usize, Option<Instant>) {
        let before = self.records.len();
        let window = self.policy.window;
        let mut oldest: Option<Instant> = None;

        self.records.retain(|_, record| {
            if record.evictable(now, window) {
                return false;
            }
            oldest = Some(oldest.map_or(record.window_start, |o| o.min(record.window_start)));
            true
        });

        if let Ok(mut hint) = self.no_room_until.lock() {
            *hint = None;
        }

        (before.saturating_sub(self.records.len()), oldest)
    }

    pub fn record(&self, client_id: &str) -> Option<QuotaRecord> {
        self.records.get(client_id).map(|record| *record)
    }

    pub fn tracked_clients(&self) -> usize {
        self.records.len()
    }

    fn has_room(&self, now: Instant) -> bool {
        let window = self.policy.window;
        self.records.len() < self.policy.capacity
            || self.records.iter().any(|entry| entry.value().evictable(now, window))
    }

    // Frees space for a new client. Live windows are never evicted: when every tracked
    // client still has usage in its window, returns how long until the oldest one ends.
    fn make_room(&self, client_id: &str, now: Instant) -> Result<(), Duration> {
        if self.records.len() < self.policy.capacity || self.records.contains_key(client_id) {
            return Ok(());
        }

        // last sweep found nothing to free, skip the scan until the oldest window ends
        if let Some(until) = self.no_room_until.lock().ok().and_then(|hint| *hint) {
            if now < until {
                return Err(until - now);
            }
        }

        let (removed, oldest) = self.sweep_tracking_oldest(now);
        if removed > 0 {
            tracing::debug!(removed, "Swept quota records to make room");
        }

        if self.records.len() < self.policy.capacity {
            return Ok(());
        }

        let window = self.policy.window;
        let until = oldest.map_or(now + window, |start| start + window);
        if let Ok(mut hint) = self.no_room_until.lock() {
            *hint = Some(until);
        }
        Err(until.saturating_duration_since(now))
    }
}

// Background sweeper - keeps the quota store from growing forever
pub async fn sweeper(guard: Arc<QuotaGuard>, every: Duration) {
    let mut ticker = interval(every);

    tracing::info!(interval = ?every, "Quota sweeper started");

    loop {
        ticker.tick().await;

        let removed = guard.sweep(tokio::time::Instant::now().into_std());
        TRACKED_CLIENTS.set(guard.tracked_clients() as f64);

        if removed > 0 {
            tracing::debug!(removed, remaining = guard.tracked_clients(), "Swept quota records");
        }
    }
}
