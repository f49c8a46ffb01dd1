use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Picks the delay a session should space its fetches by
///
/// A robots.txt `Crawl-delay` wins over the user-supplied delay; with
/// neither, fetches are not spaced at all.
pub fn effective_delay(
    robots_delay: Option<Duration>,
    user_delay: Option<Duration>,
) -> Option<Duration> {
    robots_delay
        .or(user_delay)
        .filter(|delay| !delay.is_zero())
}

/// Enforces a minimum interval between fetch start times
///
/// Slots are handed out under a short lock and then slept on outside it, so
/// concurrent callers queue up one interval apart instead of all waking at
/// once.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter; `None` or a zero interval never waits
    pub fn new(interval: Option<Duration>) -> Self {
        Self {
            interval: interval.filter(|d| !d.is_zero()),
            next_slot: Mutex::new(None),
        }
    }

    /// Creates a limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Reserves the next free slot and returns when it arrives
    pub async fn wait(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let slot = self.reserve(Instant::now(), interval);
        tokio::time::sleep_until(slot).await;
    }

    /// Returns the start time granted to a caller arriving at `now`
    fn reserve(&self, now: Instant, interval: Duration) -> Instant {
        // A poisoned lock only means another task panicked mid-update; the
        // stored instant is still usable.
        let mut next = match self.next_slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let slot = match *next {
            Some(at) if at > now => at,
            _ => now,
        };
        // An interval too large to schedule past leaves the next caller unspaced
        *next = slot.checked_add(interval);
        if next.is_none() {
            tracing::warn!("Crawl delay {:?} is out of range; not spacing requests", interval);
        }
        slot
    }
}
