//! Tap gestures: contact events coalesced into multi-tap counts.
//!
//! A tap closer than the debounce gap to the previous one is mechanical
//! bounce and is not counted. Every counted tap re-arms the burst timer;
//! when it expires the accumulated count is emitted and the burst ends.

use std::future::poll_fn;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::time::{DelayQueue, delay_queue};
use tracing::{debug, trace};

pub const DEFAULT_THRESHOLD: Duration = Duration::from_millis(300);
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(40);

/// Burst counting without a timer attached.
///
/// The caller owns the clock: [`on_tap`](Self::on_tap) reports when the
/// burst should end, and [`fire`](Self::fire) is called once it has.
#[derive(Debug, Clone)]
pub struct TapDebouncer {
    threshold: Duration,
    debounce: Duration,
    last_accepted: Option<Instant>,
    count: u32,
}

impl TapDebouncer {
    pub fn new(threshold: Duration, debounce: Duration) -> Self {
        Self {
            threshold,
            debounce,
            last_accepted: None,
            count: 0,
        }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Record a contact at `now`. Returns the new burst deadline when the
    /// tap counts, `None` when it is bounce.
    pub fn on_tap(&mut self, now: Instant) -> Option<Instant> {
        let bounced = self
            .last_accepted
            .is_some_and(|last| now.saturating_duration_since(last) < self.debounce);
        self.last_accepted = Some(now);
        if bounced {
            trace!("tap bounce ignored");
            return None;
        }
        self.count += 1;
        Some(now + self.threshold)
    }

    /// End the burst, returning how many taps it held.
    pub fn fire(&mut self) -> u32 {
        std::mem::take(&mut self.count)
    }
}

impl Default for TapDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_DEBOUNCE)
    }
}

// ── RxTap ────────────────────────────────────────────────────────

/// Tap stream handler with its burst timer.
///
/// At most one timer entry is outstanding; each counted tap removes it
/// and inserts a fresh one.
#[derive(Debug)]
pub struct RxTap {
    flag: u8,
    debouncer: TapDebouncer,
    timer: DelayQueue<()>,
    pending: Option<delay_queue::Key>,
}

impl RxTap {
    pub fn new(flag: u8, debouncer: TapDebouncer) -> Self {
        Self {
            flag,
            debouncer,
            timer: DelayQueue::new(),
            pending: None,
        }
    }

    pub fn flag(&self) -> u8 {
        self.flag
    }

    /// Whether a burst is waiting for its timer.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle one notification. Returns whether it counted as a tap.
    pub fn on_packet(&mut self, packet: &[u8]) -> bool {
        if packet.first() != Some(&self.flag) {
            return false;
        }
        let Some(deadline) = self.debouncer.on_tap(Instant::now()) else {
            return false;
        };
        if let Some(key) = self.pending.take() {
            self.timer.remove(&key);
        }
        self.pending = Some(self.timer.insert_at((), deadline));
        trace!(count = self.debouncer.count(), "tap counted");
        true
    }

    /// Poll for the end of the current burst.
    ///
    /// Stays pending while no burst is armed; arming wakes the task.
    pub fn poll_burst(&mut self, cx: &mut Context<'_>) -> Poll<u32> {
        match self.timer.poll_expired(cx) {
            Poll::Ready(Some(_)) => {
                self.pending = None;
                let count = self.debouncer.fire();
                debug!(count, "tap burst");
                Poll::Ready(count)
            }
            Poll::Ready(None) | Poll::Pending => Poll::Pending,
        }
    }

    /// Wait for the current burst to end.
    pub async fn next_burst(&mut self) -> u32 {
        poll_fn(|cx| self.poll_burst(cx)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAP: u8 = 0x09;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn debouncer_filters_bounce_and_counts_burst() {
        let start = Instant::now();
        let mut d = TapDebouncer::default();

        assert_eq!(d.on_tap(start), Some(start + ms(300)));
        assert_eq!(d.on_tap(start + ms(10)), None);
        // Gap measured from the bounce at 10ms.
        assert_eq!(d.on_tap(start + ms(90)), Some(start + ms(390)));
        assert_eq!(d.count(), 2);

        assert_eq!(d.fire(), 2);
        assert_eq!(d.count(), 0);
        assert_eq!(d.on_tap(start + ms(400)), Some(start + ms(700)));
        assert_eq!(d.count(), 1);
    }

    #[test]
    fn repeated_bounce_keeps_extending_the_gap() {
        let start = Instant::now();
        let mut d = TapDebouncer::default();
        d.on_tap(start);
        assert_eq!(d.on_tap(start + ms(30)), None);
        assert_eq!(d.on_tap(start + ms(60)), None);
        assert!(d.on_tap(start + ms(100)).is_some());
        assert_eq!(d.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_after_threshold() {
        let start = Instant::now();
        let mut tap = RxTap::new(TAP, TapDebouncer::default());

        assert!(tap.on_packet(&[TAP]));
        tokio::time::advance(ms(10)).await;
        assert!(!tap.on_packet(&[TAP]));
        tokio::time::advance(ms(80)).await;
        assert!(tap.on_packet(&[TAP]));
        assert!(tap.is_armed());

        assert_eq!(tap.next_burst().await, 2);
        assert_eq!(Instant::now() - start, ms(390));
        assert!(!tap.is_armed());

        tokio::time::advance(ms(10)).await;
        assert!(tap.on_packet(&[TAP]));
        assert_eq!(tap.next_burst().await, 1);
        assert_eq!(Instant::now() - start, ms(700));
    }

    #[test]
    fn unarmed_tap_stays_pending() {
        let mut tap = RxTap::new(TAP, TapDebouncer::default());
        let mut burst = tokio_test::task::spawn(tap.next_burst());
        tokio_test::assert_pending!(burst.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_packets_do_not_arm() {
        let mut tap = RxTap::new(TAP, TapDebouncer::default());
        assert!(!tap.on_packet(&[0x0A, 1, 2]));
        assert!(!tap.on_packet(&[]));
        assert!(!tap.is_armed());

        let waited = tokio::time::timeout(ms(1000), tap.next_burst()).await;
        assert!(waited.is_err());
    }
}
