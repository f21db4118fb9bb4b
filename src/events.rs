//! Cooperative event queue
//!
//! Devices make progress by scheduling callbacks on a single monotonic
//! timeline measured in instruction-scale ticks. The interpreter
//! decrements an interval counter as it runs and drains every due
//! event when the counter crosses zero; devices never preempt an
//! instruction in the middle.
//!
//! Cancellation discards the pending entries for a target, used when a
//! device is reset or detached.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Who an event fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventTarget {
    /// The processor's real-time clock
    Clock,
    /// An external device, by device code
    Device(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Event {
    due: u64,
    target: EventTarget,
}

/// Monotonic pending-event queue
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Event>>,
    /// Current virtual time in ticks
    pub now: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            now: 0,
        }
    }

    /// Schedule `target` to fire `delay` ticks from now
    pub fn schedule(&mut self, target: EventTarget, delay: u64) {
        self.heap.push(Reverse(Event {
            due: self.now + delay,
            target,
        }));
    }

    /// Drop every pending event for `target`
    pub fn cancel(&mut self, target: EventTarget) {
        let kept: Vec<_> = self
            .heap
            .drain()
            .filter(|Reverse(e)| e.target != target)
            .collect();
        self.heap = kept.into_iter().collect();
    }

    /// True if `target` has a pending event
    pub fn is_scheduled(&self, target: EventTarget) -> bool {
        self.heap.iter().any(|Reverse(e)| e.target == target)
    }

    /// Advance virtual time by `ticks`
    #[inline(always)]
    pub fn advance(&mut self, ticks: u64) {
        self.now += ticks;
    }

    /// Pop the next event that is due at or before the current time
    pub fn next_due(&mut self) -> Option<EventTarget> {
        match self.heap.peek() {
            Some(Reverse(e)) if e.due <= self.now => {
                let Reverse(e) = self.heap.pop().unwrap();
                Some(e.target)
            }
            _ => None,
        }
    }

    /// Ticks until the next event, if any
    pub fn until_next(&self) -> Option<u64> {
        self.heap
            .peek()
            .map(|Reverse(e)| e.due.saturating_sub(self.now))
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let mut q = EventQueue::new();
        q.schedule(EventTarget::Device(0o100), 10);
        q.schedule(EventTarget::Clock, 5);
        assert_eq!(q.next_due(), None);
        q.advance(5);
        assert_eq!(q.next_due(), Some(EventTarget::Clock));
        assert_eq!(q.next_due(), None);
        q.advance(5);
        assert_eq!(q.next_due(), Some(EventTarget::Device(0o100)));
    }

    #[test]
    fn test_cancel() {
        let mut q = EventQueue::new();
        q.schedule(EventTarget::Device(0o104), 1);
        q.schedule(EventTarget::Clock, 1);
        q.cancel(EventTarget::Device(0o104));
        assert!(!q.is_scheduled(EventTarget::Device(0o104)));
        q.advance(2);
        assert_eq!(q.next_due(), Some(EventTarget::Clock));
        assert_eq!(q.next_due(), None);
    }
}
