//! [`Latest`] – last-value-wins snapshot cell shared between a producer loop
//! and the arbitration loop.
//!
//! Publication replaces the whole record under a lock and reads copy it out
//! under the same lock, so a reader always sees one complete value, never a
//! mix of an old and a new one's fields. There is no queue: values published
//! between two reads are simply superseded.
//!
//! # Example
//!
//! ```rust
//! use rover_perception::snapshot::Latest;
//! use rover_types::DistanceSample;
//!
//! let cell = Latest::new(DistanceSample::unknown());
//! let producer = cell.clone();
//! producer.publish(DistanceSample::new(42.0));
//!
//! let snap = cell.snapshot();
//! assert_eq!(snap.value, DistanceSample::new(42.0));
//! assert_eq!(snap.sequence, 1);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Slot<T> {
    value: T,
    sequence: u64,
    published_at: Option<Instant>,
}

/// One consistent read of a [`Latest`] cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot<T> {
    pub value: T,
    /// Number of publications so far; `0` means the initial value.
    pub sequence: u64,
    /// Time since the value was published, `None` for the initial value.
    pub age: Option<Duration>,
}

/// Shared single-value cell. Clones refer to the same slot.
pub struct Latest<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Latest<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Copy> Latest<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                value: initial,
                sequence: 0,
                published_at: None,
            })),
        }
    }

    /// Replace the current value.
    pub fn publish(&self, value: T) {
        let mut slot = self.slot.lock();
        slot.value = value;
        slot.sequence += 1;
        slot.published_at = Some(Instant::now());
    }

    /// Copy of the current value.
    pub fn read(&self) -> T {
        self.slot.lock().value
    }

    /// Current value together with its sequence number and age.
    pub fn snapshot(&self) -> Snapshot<T> {
        let slot = self.slot.lock();
        Snapshot {
            value: slot.value,
            sequence: slot.sequence,
            age: slot.published_at.map(|t| t.elapsed()),
        }
    }
}

impl<T: Copy + Default> Default for Latest<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rover_types::DetectionResult;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn initial_value_has_sequence_zero() {
        let cell: Latest<DetectionResult> = Latest::default();
        let snap = cell.snapshot();
        assert_eq!(snap.value, DetectionResult::NotFound);
        assert_eq!(snap.sequence, 0);
        assert!(snap.age.is_none());
    }

    #[test]
    fn last_writer_wins() {
        let cell = Latest::new(0u32);
        cell.publish(1);
        cell.publish(2);
        cell.publish(3);
        assert_eq!(cell.read(), 3);
        assert_eq!(cell.snapshot().sequence, 3);
    }

    #[test]
    fn concurrent_reads_are_never_torn() {
        let cell = Latest::new(DetectionResult::Found {
            center_x: 0,
            center_y: 0,
            confidence: 0.0,
        });
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let cell = cell.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for i in 0..20_000 {
                    cell.publish(DetectionResult::Found {
                        center_x: i,
                        center_y: -i,
                        confidence: i as f32,
                    });
                }
                done.store(true, Ordering::Release);
            })
        };

        while !done.load(Ordering::Acquire) {
            if let DetectionResult::Found {
                center_x,
                center_y,
                confidence,
            } = cell.read()
            {
                assert_eq!(center_y, -center_x);
                assert_eq!(confidence, center_x as f32);
            }
        }
        writer.join().unwrap();
    }
}
