use std::time::{Duration, Instant};

/// Delays are clamped to this so `Instant + delay` cannot overflow.
const MAX_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// A payload as stored in the heap, with the timestamps used for delay
/// gating and residency metrics.
#[derive(Debug, Clone)]
pub struct QueueItem<T> {
    item: T,
    inserted_at: Instant,
    not_before: Option<Instant>,
}

impl<T> QueueItem<T> {
    /// Wrap an item that is ready immediately
    pub fn new(item: T) -> Self {
        Self::at(item, Instant::now(), Duration::ZERO)
    }

    /// Wrap an item that becomes ready after `delay`
    pub fn delayed(item: T, delay: Duration) -> Self {
        Self::at(item, Instant::now(), delay)
    }

    /// Wrap an item relative to an explicit capture time. A zero delay
    /// leaves the gate unset.
    pub fn at(item: T, now: Instant, delay: Duration) -> Self {
        let not_before = if delay.is_zero() {
            None
        } else {
            Some(now + delay.min(MAX_DELAY))
        };

        QueueItem {
            item,
            inserted_at: now,
            not_before,
        }
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn into_inner(self) -> T {
        self.item
    }

    pub fn inserted_at(&self) -> Instant {
        self.inserted_at
    }

    pub fn not_before(&self) -> Option<Instant> {
        self.not_before
    }

    /// Check if the item may be dequeued at `now`
    pub fn is_ready_at(&self, now: Instant) -> bool {
        match self.not_before {
            Some(gate) => gate <= now,
            None => true,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready_at(Instant::now())
    }

    /// Time left until the gate opens (zero when ready)
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.not_before
            .map(|gate| gate.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    /// How long the item has been queued as of `now`
    pub fn residency_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.inserted_at)
    }
}
