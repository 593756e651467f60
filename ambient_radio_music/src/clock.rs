// Timers: the `Clock` seam the composer arms its next cycle on, and a
// manually advanced implementation for headless sessions and tests.
//
// The composer never sleeps or spawns anything. It asks a `Clock` for a
// handle that fires after N milliseconds, keeps that handle, and is later
// told "this handle fired" by whoever drives the clock. Cancelling is by
// handle, so a stale fire for a cancelled or superseded timer can always be
// recognized and ignored.
//
// `ManualClock` keeps pending timers in a min-heap ordered by
// `(due_ms, sequence)`, so timers due at the same millisecond fire in the
// order they were armed. Time only moves when the driver calls `pop_due` or
// `advance_to`. Cancelled timers are dropped lazily when they reach the top
// of the heap.
//
// See also: composer.rs (the single autoplay timer), session.rs (drives a
// `ManualClock` and dispatches fired handles).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};

/// Identifies one armed timer. Handles are never reused by a clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

pub trait Clock {
    /// Milliseconds since the clock started.
    fn now_ms(&self) -> u64;

    /// Arm a timer that fires `after_ms` from now.
    fn schedule(&mut self, after_ms: u64) -> TimerHandle;

    /// Disarm a timer. Returns `false` if it already fired or was cancelled.
    fn cancel(&mut self, handle: TimerHandle) -> bool;
}

#[derive(Clone, Copy, Debug)]
struct PendingTimer {
    due_ms: u64,
    sequence: u64,
}

// Min-heap: the earliest (due_ms, sequence) must compare greatest.
impl PartialEq for PendingTimer {
    fn eq(&self, other: &Self) -> bool {
        self.due_ms == other.due_ms && self.sequence == other.sequence
    }
}

impl Eq for PendingTimer {}

impl PartialOrd for PendingTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due_ms
            .cmp(&self.due_ms)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Virtual clock stepped by its owner.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now_ms: u64,
    heap: BinaryHeap<PendingTimer>,
    /// Sequences of timers that are armed and not cancelled.
    live: BTreeSet<u64>,
    next_sequence: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop cancelled timers sitting at the top of the heap.
    fn discard_cancelled(&mut self) {
        while let Some(top) = self.heap.peek() {
            if self.live.contains(&top.sequence) {
                break;
            }
            self.heap.pop();
        }
    }

    /// When the next live timer is due, if any.
    pub fn next_due_ms(&mut self) -> Option<u64> {
        self.discard_cancelled();
        self.heap.peek().map(|t| t.due_ms)
    }

    /// Fire the next live timer due at or before `until_ms`, moving the clock
    /// to its due time. `None` once nothing more is due by then.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<TimerHandle> {
        let due_ms = self.next_due_ms()?;
        if due_ms > until_ms {
            return None;
        }
        let timer = self.heap.pop()?;
        self.live.remove(&timer.sequence);
        self.now_ms = self.now_ms.max(timer.due_ms);
        Some(TimerHandle(timer.sequence))
    }

    /// Move the clock forward without firing anything. Never moves backward.
    pub fn advance_to(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }

    /// Number of armed, uncancelled timers.
    pub fn pending(&self) -> usize {
        self.live.len()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule(&mut self, after_ms: u64) -> TimerHandle {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(PendingTimer {
            due_ms: self.now_ms.saturating_add(after_ms),
            sequence,
        });
        self.live.insert(sequence);
        TimerHandle(sequence)
    }

    fn cancel(&mut self, handle: TimerHandle) -> bool {
        self.live.remove(&handle.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timers_fire_in_due_then_arm_order() {
        let mut clock = ManualClock::new();
        let late = clock.schedule(100);
        let early_a = clock.schedule(50);
        let early_b = clock.schedule(50);

        assert_eq!(clock.pop_due(200), Some(early_a));
        assert_eq!(clock.now_ms(), 50);
        assert_eq!(clock.pop_due(200), Some(early_b));
        assert_eq!(clock.pop_due(200), Some(late));
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.pop_due(200), None);
    }

    #[test]
    fn test_pop_due_respects_limit() {
        let mut clock = ManualClock::new();
        let handle = clock.schedule(100);
        assert_eq!(clock.pop_due(99), None);
        assert_eq!(clock.now_ms(), 0);
        assert_eq!(clock.pop_due(100), Some(handle));
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let mut clock = ManualClock::new();
        let cancelled = clock.schedule(10);
        let kept = clock.schedule(20);
        assert!(clock.cancel(cancelled));
        assert!(!clock.cancel(cancelled));
        assert_eq!(clock.pending(), 1);
        assert_eq!(clock.next_due_ms(), Some(20));
        assert_eq!(clock.pop_due(1_000), Some(kept));
        assert!(!clock.cancel(kept));
    }

    #[test]
    fn test_schedule_is_relative_to_now() {
        let mut clock = ManualClock::new();
        clock.advance_to(1_000);
        clock.advance_to(500);
        assert_eq!(clock.now_ms(), 1_000);
        clock.schedule(250);
        assert_eq!(clock.next_due_ms(), Some(1_250));
    }
}
