//! Single-slot acquisition handoff between the sample clock and the
//! tick loop.
//!
//! The producer side (the sample clock) stages one raw acquisition value and
//! raises a ready flag. The consumer side (the tick loop) reads the value,
//! processes it, and only then lowers the flag with
//! [`acknowledge`](Handoff::acknowledge). There is exactly one slot: a value
//! staged before the previous one was acknowledged replaces it, and
//! acknowledging also discards anything staged while the tick ran. Either
//! way the lost value vanishes without a trace. This is the intended overrun
//! behavior, not an error.
//!
//! Value, ready flag and closed flag share one atomic word, so staging and
//! acknowledging are each a single atomic operation and the producer never
//! blocks.

use std::{
    hint,
    sync::atomic::{AtomicU64, Ordering},
};

/// Low 32 bits of the slot: the raw acquisition value.
const VALUE_MASK: u64 = 0xFFFF_FFFF;

/// Set when the slot holds a value that has not been acknowledged yet.
const READY: u64 = 1 << 32;

/// Set once the producer will not stage any more values.
const CLOSED: u64 = 1 << 33;

/// Outcome of polling the [`Handoff`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Acquisition {
    /// A raw value is staged and not yet acknowledged.
    Ready(u32),

    /// Nothing new since the last acknowledgement.
    Pending,

    /// The producer has finished and the slot is drained.
    Closed,
}

/// Lossy single-slot mailbox.
#[derive(Debug, Default)]
pub struct Handoff {
    slot: AtomicU64,
}

impl Handoff {
    /// Creates an empty, open handoff.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages a raw acquisition value and raises the ready flag.
    ///
    /// Overwrites any value that has not been acknowledged yet. Must not be
    /// called after [`close`](Self::close).
    #[inline]
    pub fn write(&self, raw: u32) {
        self.slot.store(READY | u64::from(raw), Ordering::Release);
    }

    /// Marks the producer as finished.
    ///
    /// A value staged before closing is still delivered.
    pub fn close(&self) {
        self.slot.fetch_or(CLOSED, Ordering::Release);
    }

    /// Returns `true` if a value is staged and not yet acknowledged.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slot.load(Ordering::Acquire) & READY != 0
    }

    /// Returns `true` once the producer has closed the handoff.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.slot.load(Ordering::Acquire) & CLOSED != 0
    }

    /// Reads the staged value without lowering the ready flag.
    #[inline]
    pub fn peek(&self) -> Acquisition {
        let slot = self.slot.load(Ordering::Acquire);
        if slot & READY != 0 {
            // Masked to the low 32 bits
            #[allow(clippy::cast_possible_truncation)]
            let raw = (slot & VALUE_MASK) as u32;
            Acquisition::Ready(raw)
        } else if slot & CLOSED != 0 {
            Acquisition::Closed
        } else {
            Acquisition::Pending
        }
    }

    /// Lowers the ready flag.
    ///
    /// Whatever was staged since the last [`peek`](Self::peek) is dropped
    /// along with the value that was read.
    #[inline]
    pub fn acknowledge(&self) {
        self.slot.fetch_and(!READY, Ordering::AcqRel);
    }

    /// Busy-waits until a value is staged, returning `None` once the handoff
    /// is closed and drained.
    ///
    /// The ready flag stays raised: call [`acknowledge`](Self::acknowledge)
    /// once the value has been processed.
    pub fn wait(&self) -> Option<u32> {
        loop {
            match self.peek() {
                Acquisition::Ready(raw) => return Some(raw),
                Acquisition::Closed => return None,
                Acquisition::Pending => hint::spin_loop(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn starts_pending() {
        let handoff = Handoff::new();
        assert!(!handoff.is_ready());
        assert_eq!(handoff.peek(), Acquisition::Pending);
    }

    #[test]
    fn peek_leaves_ready_until_acknowledged() {
        let handoff = Handoff::new();
        handoff.write(1000);
        assert_eq!(handoff.peek(), Acquisition::Ready(1000));
        assert_eq!(handoff.peek(), Acquisition::Ready(1000));
        assert!(handoff.is_ready());

        handoff.acknowledge();
        assert!(!handoff.is_ready());
        assert_eq!(handoff.peek(), Acquisition::Pending);
    }

    #[test]
    fn unread_value_is_overwritten() {
        let handoff = Handoff::new();
        handoff.write(1);
        handoff.write(2);
        assert_eq!(handoff.peek(), Acquisition::Ready(2));
        handoff.acknowledge();
        assert_eq!(handoff.peek(), Acquisition::Pending);
    }

    #[test]
    fn value_staged_before_acknowledge_is_lost() {
        let handoff = Handoff::new();
        handoff.write(1);
        assert_eq!(handoff.peek(), Acquisition::Ready(1));
        handoff.write(2);
        handoff.acknowledge();
        assert_eq!(handoff.peek(), Acquisition::Pending);
    }

    #[test]
    fn full_width_values_survive() {
        let handoff = Handoff::new();
        handoff.write(u32::MAX);
        assert_eq!(handoff.peek(), Acquisition::Ready(u32::MAX));
        handoff.acknowledge();
        handoff.write(0);
        assert_eq!(handoff.peek(), Acquisition::Ready(0));
    }

    #[test]
    fn close_delivers_last_value_first() {
        let handoff = Handoff::new();
        handoff.write(7);
        handoff.close();
        assert!(handoff.is_closed());
        assert_eq!(handoff.wait(), Some(7));
        handoff.acknowledge();
        assert!(handoff.is_closed());
        assert_eq!(handoff.peek(), Acquisition::Closed);
        assert_eq!(handoff.wait(), None);
    }

    #[test]
    fn values_cross_threads_in_order() {
        let handoff = Arc::new(Handoff::new());
        let producer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || {
                for raw in 1..=1000 {
                    handoff.write(raw);
                    while handoff.is_ready() {
                        hint::spin_loop();
                    }
                }
                handoff.close();
            })
        };

        let mut received = Vec::new();
        while let Some(raw) = handoff.wait() {
            received.push(raw);
            handoff.acknowledge();
        }
        producer.join().unwrap();

        assert_eq!(received, (1..=1000).collect::<Vec<_>>());
    }

    #[test]
    fn overruns_only_lose_values() {
        let handoff = Arc::new(Handoff::new());
        let producer = {
            let handoff = Arc::clone(&handoff);
            thread::spawn(move || {
                for raw in 1..=10_000 {
                    handoff.write(raw);
                }
                handoff.close();
            })
        };

        let mut received = Vec::new();
        while let Some(raw) = handoff.wait() {
            received.push(raw);
            handoff.acknowledge();
        }
        producer.join().unwrap();

        assert!(!received.is_empty());
        assert!(received.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
