use std::collections::VecDeque;
use std::time::{Duration, Instant};

use fl_core::{FrameDescriptor, OverflowPolicy, QueueConfig};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace, warn};

/// What happened to a pushed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Queued,
    /// Queued after evicting the oldest entry.
    DroppedOldest,
    /// The pushed frame itself was discarded.
    Dropped,
    /// The queue is closed; the frame was discarded.
    Closed,
}

impl PushOutcome {
    pub fn is_drop(self) -> bool {
        !matches!(self, PushOutcome::Queued)
    }
}

/// FIFO shared by the capture callback and the send worker.
///
/// The lock only guards list manipulation. Evicted and drained entries are
/// dropped after it is released. A closed queue rejects every push until it
/// is reopened.
pub struct FrameQueue<T = FrameDescriptor> {
    inner: Mutex<Inner<T>>,
    space: Condvar,
    capacity: Option<usize>,
    overflow: OverflowPolicy,
    block_timeout: Duration,
}

struct Inner<T> {
    frames: VecDeque<T>,
    closed: bool,
}

impl<T> FrameQueue<T> {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                frames: VecDeque::with_capacity(config.capacity.unwrap_or(8)),
                closed: false,
            }),
            space: Condvar::new(),
            capacity: config.capacity,
            overflow: config.overflow,
            block_timeout: Duration::from_millis(config.block_timeout_ms),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(&QueueConfig {
            capacity: None,
            ..Default::default()
        })
    }

    pub fn push(&self, item: T) -> PushOutcome {
        let mut inner = self.inner.lock();

        if inner.closed {
            drop(inner);
            trace!("Send queue closed, dropped incoming frame");
            return PushOutcome::Closed;
        }

        let Some(capacity) = self.capacity else {
            inner.frames.push_back(item);
            return PushOutcome::Queued;
        };

        if inner.frames.len() < capacity {
            inner.frames.push_back(item);
            return PushOutcome::Queued;
        }

        match self.overflow {
            OverflowPolicy::DropOldest => {
                let evicted = inner.frames.pop_front();
                inner.frames.push_back(item);
                drop(inner);
                drop(evicted);
                debug!("Send queue full, dropped oldest frame");
                PushOutcome::DroppedOldest
            }
            OverflowPolicy::DropNewest => {
                drop(inner);
                debug!("Send queue full, dropped incoming frame");
                PushOutcome::Dropped
            }
            OverflowPolicy::Block => {
                let deadline = Instant::now() + self.block_timeout;
                while !inner.closed && inner.frames.len() >= capacity {
                    if self.space.wait_until(&mut inner, deadline).timed_out()
                        && !inner.closed
                        && inner.frames.len() >= capacity
                    {
                        drop(inner);
                        warn!("Send queue still full after {:?}, dropped incoming frame", self.block_timeout);
                        return PushOutcome::Dropped;
                    }
                }
                if inner.closed {
                    drop(inner);
                    debug!("Send queue closed while waiting for space, dropped incoming frame");
                    return PushOutcome::Closed;
                }
                inner.frames.push_back(item);
                PushOutcome::Queued
            }
        }
    }

    pub fn pop(&self) -> Option<T> {
        let item = self.inner.lock().frames.pop_front();
        if item.is_some() {
            self.space.notify_one();
        }
        item
    }

    /// Release every queued entry, returning how many there were.
    pub fn drain(&self) -> usize {
        let drained: Vec<T> = self.inner.lock().frames.drain(..).collect();
        self.space.notify_all();
        drained.len()
    }

    /// Reject further pushes, wake blocked producers and release every
    /// queued entry. Returns how many entries were released.
    pub fn close(&self) -> usize {
        let drained: Vec<T> = {
            let mut inner = self.inner.lock();
            inner.closed = true;
            inner.frames.drain(..).collect()
        };
        self.space.notify_all();
        drained.len()
    }

    /// Accept pushes again, releasing anything left over from before.
    pub fn reopen(&self) -> usize {
        let drained: Vec<T> = {
            let mut inner = self.inner.lock();
            inner.closed = false;
            inner.frames.drain(..).collect()
        };
        drained.len()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().frames.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts its own drops so ownership can be checked.
    struct Tracked {
        id: u32,
        drops: Arc<AtomicUsize>,
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bounded(capacity: usize, overflow: OverflowPolicy) -> QueueConfig {
        QueueConfig {
            capacity: Some(capacity),
            overflow,
            block_timeout_ms: 5,
        }
    }

    proptest! {
        #[test]
        fn prop_fifo_and_single_release(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
            let drops = Arc::new(AtomicUsize::new(0));
            let queue = FrameQueue::unbounded();
            let mut model = VecDeque::new();
            let mut pushed = 0u32;

            for push in ops {
                if push {
                    queue.push(Tracked { id: pushed, drops: drops.clone() });
                    model.push_back(pushed);
                    pushed += 1;
                } else {
                    let got = queue.pop().map(|t| t.id);
                    prop_assert_eq!(got, model.pop_front());
                }
            }

            prop_assert_eq!(queue.len(), model.len());
            queue.drain();
            prop_assert_eq!(drops.load(Ordering::SeqCst), pushed as usize);
        }

        #[test]
        fn prop_bounded_queue_keeps_newest(count in 0u32..64, capacity in 1usize..10) {
            let drops = Arc::new(AtomicUsize::new(0));
            let queue = FrameQueue::new(&bounded(capacity, OverflowPolicy::DropOldest));

            let mut evicted = 0;
            for id in 0..count {
                if queue.push(Tracked { id, drops: drops.clone() }).is_drop() {
                    evicted += 1;
                }
            }

            prop_assert_eq!(drops.load(Ordering::SeqCst), evicted);
            prop_assert!(queue.len() <= capacity);

            let first = count.saturating_sub(capacity as u32);
            for expected in first..count {
                prop_assert_eq!(queue.pop().map(|t| t.id), Some(expected));
            }
            prop_assert_eq!(drops.load(Ordering::SeqCst), count as usize);
        }
    }

    #[test]
    fn test_drop_newest_rejects_incoming() {
        let queue = FrameQueue::new(&bounded(2, OverflowPolicy::DropNewest));

        assert_eq!(queue.push(1), PushOutcome::Queued);
        assert_eq!(queue.push(2), PushOutcome::Queued);
        assert_eq!(queue.push(3), PushOutcome::Dropped);

        assert_eq!(queue.pop(), Some(1));
        assert_eq!(queue.pop(), Some(2));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_block_gives_up_after_timeout() {
        let queue = FrameQueue::new(&bounded(1, OverflowPolicy::Block));
        queue.push(1);

        let start = Instant::now();
        assert_eq!(queue.push(2), PushOutcome::Dropped);
        assert!(start.elapsed() >= Duration::from_millis(5));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_block_resumes_when_space_frees() {
        let queue = Arc::new(FrameQueue::new(&QueueConfig {
            capacity: Some(1),
            overflow: OverflowPolicy::Block,
            block_timeout_ms: 5_000,
        }));
        queue.push(1);

        let consumer = {
            let queue = queue.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                queue.pop()
            })
        };

        assert_eq!(queue.push(2), PushOutcome::Queued);
        assert_eq!(consumer.join().unwrap(), Some(1));
        assert_eq!(queue.pop(), Some(2));
    }

    #[test]
    fn test_drain_releases_everything() {
        let drops = Arc::new(AtomicUsize::new(0));
        let queue = FrameQueue::unbounded();
        for id in 0..5 {
            queue.push(Tracked { id, drops: drops.clone() });
        }

        assert_eq!(queue.drain(), 5);
        assert_eq!(drops.load(Ordering::SeqCst), 5);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_close_wakes_blocked_producer_and_rejects_it() {
        let drops = Arc::new(AtomicUsize::new(0));
        let queue = Arc::new(FrameQueue::new(&QueueConfig {
            capacity: Some(1),
            overflow: OverflowPolicy::Block,
            block_timeout_ms: 5_000,
        }));
        queue.push(Tracked { id: 0, drops: drops.clone() });

        let producer = {
            let queue = queue.clone();
            let drops = drops.clone();
            std::thread::spawn(move || {
                let start = Instant::now();
                let outcome = queue.push(Tracked { id: 1, drops });
                (outcome, start.elapsed())
            })
        };

        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.close(), 1);

        let (outcome, waited) = producer.join().unwrap();
        assert_eq!(outcome, PushOutcome::Closed);
        assert!(waited < Duration::from_secs(2));
        assert!(queue.is_empty());
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_closed_queue_drops_until_reopened() {
        let queue = FrameQueue::unbounded();
        queue.push(1);
        queue.close();

        assert!(queue.is_closed());
        assert_eq!(queue.push(2), PushOutcome::Closed);
        assert!(queue.is_empty());

        assert_eq!(queue.reopen(), 0);
        assert_eq!(queue.push(3), PushOutcome::Queued);
        assert_eq!(queue.pop(), Some(3));
    }
}
